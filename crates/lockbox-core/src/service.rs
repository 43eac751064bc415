//! The secret service orchestrator.
//!
//! Every operation is a single-pass pipeline: authorization gate → domain
//! operation (encode/encrypt/store or load/decrypt/decode) → result. None of
//! the failures are transient, so nothing here retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lockbox_audit::{AuditAction, AuditEvent, AuditLog, AuditOutcome};
use lockbox_crypto::{Nonce, Tag};
use lockbox_storage::{
    ActorId, Envelope, InsertSecretParams, ListQuery, OrganizationId, SecretId, SecretKind,
    SecretPatch, SecretRecord, SecretStore, StoreError,
};
use serde::Serialize;
use tracing::{debug, error, warn};
use zeroize::Zeroizing;

use crate::actor::Actor;
use crate::error::SecretServiceError;
use crate::keyring::KeyProvider;
use crate::payload::SecretPayload;
use crate::permission::{check_permission, OrgAction, OrgSubject, PermissionError, ResourceAttrs};

/// Decrypted, caller-facing shape of a record. Ciphertext never travels
/// upward through this type.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretView {
    pub id: SecretId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SecretKind,
    pub data: SecretPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: ActorId,
}

impl SecretView {
    fn assemble(record: SecretRecord, data: SecretPayload) -> Self {
        Self {
            id: record.id,
            name: record.name,
            kind: record.kind,
            data,
            created_at: record.created_at,
            updated_at: record.updated_at,
            created_by: record.created_by,
        }
    }
}

/// One page of decrypted views plus the organization-wide total.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretListView {
    pub items: Vec<SecretView>,
    pub total_count: u64,
}

#[derive(Clone, Debug)]
pub struct CreateSecretRequest {
    pub name: String,
    pub payload: SecretPayload,
}

#[derive(Clone, Debug, Default)]
pub struct UpdateSecretRequest {
    pub name: Option<String>,
    /// Replacement payload. Must carry the record's kind; changing the kind
    /// is not supported.
    pub payload: Option<SecretPayload>,
}

/// Orchestrates codec, cipher, store, and gate into the five public
/// operations.
pub struct SecretService<S> {
    pub store: S,
    keys: Arc<dyn KeyProvider>,
    audit: Arc<dyn AuditLog>,
}

fn envelope_aad(organization_id: &OrganizationId, kind: SecretKind) -> Vec<u8> {
    format!("secret:{}:{}", organization_id, kind.as_str()).into_bytes()
}

impl<S: SecretStore> SecretService<S> {
    pub fn new(store: S, keys: Arc<dyn KeyProvider>, audit: Arc<dyn AuditLog>) -> Self {
        Self { store, keys, audit }
    }

    pub async fn create_secret(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        request: CreateSecretRequest,
    ) -> Result<SecretView, SecretServiceError> {
        self.gate(
            actor,
            OrgAction::Create,
            organization_id,
            None,
            AuditAction::SecretCreate,
            None,
        )
        .await?;

        let kind = request.payload.kind();
        let envelope = self.seal(organization_id, kind, &request.payload)?;
        let record = self
            .store
            .insert(&InsertSecretParams {
                organization_id: *organization_id,
                created_by: actor.id,
                name: request.name,
                kind,
                envelope,
            })
            .await?;

        debug!(secret_id = %record.id, organization_id = %organization_id, kind = %kind, "secret created");
        self.record_audit(
            actor,
            organization_id,
            AuditAction::SecretCreate,
            Some(record.id),
            AuditOutcome::Success,
            None,
        )
        .await;

        Ok(SecretView::assemble(record, request.payload))
    }

    pub async fn get_secret(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        id: &SecretId,
    ) -> Result<SecretView, SecretServiceError> {
        self.gate(
            actor,
            OrgAction::Read,
            organization_id,
            None,
            AuditAction::SecretRead,
            Some(*id),
        )
        .await?;

        let record = self
            .load(actor, organization_id, id, AuditAction::SecretRead)
            .await?;
        self.gate(
            actor,
            OrgAction::Read,
            organization_id,
            Some(&ResourceAttrs::from(&record)),
            AuditAction::SecretRead,
            Some(*id),
        )
        .await?;

        let payload = self
            .open_audited(actor, AuditAction::SecretRead, &record)
            .await?;

        self.record_audit(
            actor,
            organization_id,
            AuditAction::SecretRead,
            Some(record.id),
            AuditOutcome::Success,
            None,
        )
        .await;

        Ok(SecretView::assemble(record, payload))
    }

    pub async fn list_secrets(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        query: &ListQuery,
    ) -> Result<SecretListView, SecretServiceError> {
        self.gate(
            actor,
            OrgAction::Read,
            organization_id,
            None,
            AuditAction::SecretList,
            None,
        )
        .await?;

        let page = self.store.list_by_org(organization_id, query).await?;

        let mut items = Vec::with_capacity(page.records.len());
        for record in page.records {
            let payload = self
                .open_audited(actor, AuditAction::SecretList, &record)
                .await?;
            items.push(SecretView::assemble(record, payload));
        }

        debug!(organization_id = %organization_id, count = items.len(), total = page.total_count, "secrets listed");
        self.record_audit(
            actor,
            organization_id,
            AuditAction::SecretList,
            None,
            AuditOutcome::Success,
            None,
        )
        .await;

        Ok(SecretListView {
            items,
            total_count: page.total_count,
        })
    }

    pub async fn update_secret(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        id: &SecretId,
        request: UpdateSecretRequest,
    ) -> Result<SecretView, SecretServiceError> {
        self.gate(
            actor,
            OrgAction::Edit,
            organization_id,
            None,
            AuditAction::SecretUpdate,
            Some(*id),
        )
        .await?;

        let record = self
            .load(actor, organization_id, id, AuditAction::SecretUpdate)
            .await?;
        self.gate(
            actor,
            OrgAction::Edit,
            organization_id,
            Some(&ResourceAttrs::from(&record)),
            AuditAction::SecretUpdate,
            Some(*id),
        )
        .await?;

        let mut patch = SecretPatch {
            name: request.name,
            ..Default::default()
        };

        let data = match request.payload {
            Some(payload) => {
                if payload.kind() != record.kind {
                    self.record_audit(
                        actor,
                        organization_id,
                        AuditAction::SecretUpdate,
                        Some(*id),
                        AuditOutcome::InvalidRequest,
                        Some("payload kind does not match record kind"),
                    )
                    .await;
                    return Err(SecretServiceError::ImmutableField);
                }
                patch.envelope = Some(self.seal(organization_id, record.kind, &payload)?);
                payload
            }
            // Name-only update: the old envelope stays untouched; we only
            // decrypt to build the returned view.
            None => {
                self.open_audited(actor, AuditAction::SecretUpdate, &record)
                    .await?
            }
        };

        let updated = self.store.update(organization_id, id, &patch).await?;

        debug!(secret_id = %updated.id, organization_id = %organization_id, reencrypted = patch.envelope.is_some(), "secret updated");
        self.record_audit(
            actor,
            organization_id,
            AuditAction::SecretUpdate,
            Some(updated.id),
            AuditOutcome::Success,
            None,
        )
        .await;

        Ok(SecretView::assemble(updated, data))
    }

    pub async fn delete_secret(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        id: &SecretId,
    ) -> Result<(), SecretServiceError> {
        self.gate(
            actor,
            OrgAction::Delete,
            organization_id,
            None,
            AuditAction::SecretDelete,
            Some(*id),
        )
        .await?;

        let record = self
            .load(actor, organization_id, id, AuditAction::SecretDelete)
            .await?;
        self.gate(
            actor,
            OrgAction::Delete,
            organization_id,
            Some(&ResourceAttrs::from(&record)),
            AuditAction::SecretDelete,
            Some(*id),
        )
        .await?;

        match self.store.delete(organization_id, id).await {
            Ok(()) => {}
            // Lost the race to a concurrent delete of the same record.
            Err(StoreError::NotFound) => {
                self.record_audit(
                    actor,
                    organization_id,
                    AuditAction::SecretDelete,
                    Some(*id),
                    AuditOutcome::NotFound,
                    None,
                )
                .await;
                return Err(SecretServiceError::NotFound);
            }
            Err(err) => return Err(err.into()),
        }

        debug!(secret_id = %id, organization_id = %organization_id, "secret deleted");
        self.record_audit(
            actor,
            organization_id,
            AuditAction::SecretDelete,
            Some(*id),
            AuditOutcome::Success,
            None,
        )
        .await;

        Ok(())
    }

    // ───────────────────────────── internals ─────────────────────────────

    fn seal(
        &self,
        organization_id: &OrganizationId,
        kind: SecretKind,
        payload: &SecretPayload,
    ) -> Result<Envelope, SecretServiceError> {
        let key = self.keys.key_for(organization_id)?;
        let plaintext = Zeroizing::new(payload.to_bytes()?);
        let aad = envelope_aad(organization_id, kind);

        let (nonce, ciphertext, tag) = lockbox_crypto::encrypt(&plaintext, &key, &aad)?;
        Ok(Envelope {
            ciphertext: ciphertext.0,
            nonce: nonce.0.to_vec(),
            tag: tag.0.to_vec(),
        })
    }

    fn open(&self, record: &SecretRecord) -> Result<SecretPayload, SecretServiceError> {
        let key = self.keys.key_for(&record.organization_id)?;

        // Off-size nonce/tag can only come from a corrupted row.
        let nonce: [u8; lockbox_crypto::NONCE_LEN] = record
            .envelope
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| SecretServiceError::AuthenticationFailed)?;
        let tag: [u8; lockbox_crypto::TAG_LEN] = record
            .envelope
            .tag
            .as_slice()
            .try_into()
            .map_err(|_| SecretServiceError::AuthenticationFailed)?;

        let aad = envelope_aad(&record.organization_id, record.kind);
        let plaintext = lockbox_crypto::decrypt(
            &record.envelope.ciphertext,
            &Nonce(nonce),
            &Tag(tag),
            &key,
            &aad,
        )
        .map_err(|_| SecretServiceError::AuthenticationFailed)?;

        Ok(SecretPayload::from_bytes(record.kind, &plaintext)?)
    }

    /// Decrypt a record, treating authentication failure as an integrity
    /// incident: error-level log plus its own audit outcome, separate from
    /// not-found/forbidden noise.
    async fn open_audited(
        &self,
        actor: &Actor,
        action: AuditAction,
        record: &SecretRecord,
    ) -> Result<SecretPayload, SecretServiceError> {
        match self.open(record) {
            Ok(payload) => Ok(payload),
            Err(err @ SecretServiceError::AuthenticationFailed) => {
                error!(
                    secret_id = %record.id,
                    organization_id = %record.organization_id,
                    "envelope failed authentication; possible tamper or corruption"
                );
                self.record_audit(
                    actor,
                    &record.organization_id,
                    action,
                    Some(record.id),
                    AuditOutcome::IntegrityFailure,
                    Some("envelope authentication failed"),
                )
                .await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn gate(
        &self,
        actor: &Actor,
        action: OrgAction,
        organization_id: &OrganizationId,
        resource: Option<&ResourceAttrs>,
        audit_action: AuditAction,
        resource_id: Option<SecretId>,
    ) -> Result<(), SecretServiceError> {
        if let Err(err) =
            check_permission(actor, action, OrgSubject::Secrets, organization_id, resource)
        {
            // Grant misses and actor/org binding problems are logged apart;
            // callers see a uniform Forbidden either way.
            match &err {
                PermissionError::MissingGrant { .. } => {
                    warn!(actor_id = %actor.id, organization_id = %organization_id, %err, "permission denied")
                }
                _ => {
                    warn!(actor_id = %actor.id, organization_id = %organization_id, %err, "actor binding rejected")
                }
            }
            let reason = err.to_string();
            self.record_audit(
                actor,
                organization_id,
                audit_action,
                resource_id,
                AuditOutcome::PermissionDenied,
                Some(reason.as_str()),
            )
            .await;
            return Err(SecretServiceError::Forbidden);
        }
        Ok(())
    }

    async fn load(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        id: &SecretId,
        audit_action: AuditAction,
    ) -> Result<SecretRecord, SecretServiceError> {
        match self.store.get_by_id(organization_id, id).await {
            Ok(record) => Ok(record),
            Err(StoreError::NotFound) => {
                self.record_audit(
                    actor,
                    organization_id,
                    audit_action,
                    Some(*id),
                    AuditOutcome::NotFound,
                    None,
                )
                .await;
                Err(SecretServiceError::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn record_audit(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        action: AuditAction,
        resource_id: Option<SecretId>,
        outcome: AuditOutcome,
        reason: Option<&str>,
    ) {
        let mut builder =
            AuditEvent::builder(actor.id.0, organization_id.0, action).outcome(outcome);
        if let Some(id) = resource_id {
            builder = builder.resource_id(id.to_string());
        }
        if let Some(reason) = reason {
            builder = builder.reason(reason);
        }
        if let Err(err) = self.audit.record(builder.build()).await {
            warn!(%err, "failed to record audit event");
        }
    }
}
