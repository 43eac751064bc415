//! In-memory SecretStore implementation.
//!
//! This implementation is suitable for:
//! - Tests and embedding
//! - Development and single-process tools
//!
//! It is the reference for the trait's ordering and scoping semantics; the
//! durable backends must behave identically.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use lockbox_storage::{
    InsertSecretParams, ListQuery, OrganizationId, SecretId, SecretPage, SecretPatch,
    SecretRecord, SecretStore, StoreError,
};
use uuid::Uuid;

/// In-memory secret store backed by a RwLock'd map.
///
/// Rows are only visible within a single process.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<Uuid, SecretRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> StoreError {
        StoreError::Backend("store lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl SecretStore for MemoryStore {
    async fn insert(&self, params: &InsertSecretParams) -> Result<SecretRecord, StoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::lock_poisoned())?;

        let id = SecretId::generate();
        if rows.contains_key(&id.0) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let record = SecretRecord {
            id,
            organization_id: params.organization_id,
            created_by: params.created_by,
            name: params.name.clone(),
            kind: params.kind,
            envelope: params.envelope.clone(),
            created_at: now,
            updated_at: now,
        };
        rows.insert(id.0, record.clone());
        Ok(record)
    }

    async fn get_by_id(
        &self,
        org_id: &OrganizationId,
        id: &SecretId,
    ) -> Result<SecretRecord, StoreError> {
        let rows = self.rows.read().map_err(|_| Self::lock_poisoned())?;
        rows.get(&id.0)
            .filter(|r| r.organization_id == *org_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_by_org(
        &self,
        org_id: &OrganizationId,
        query: &ListQuery,
    ) -> Result<SecretPage, StoreError> {
        let rows = self.rows.read().map_err(|_| Self::lock_poisoned())?;

        let mut matching: Vec<&SecretRecord> = rows
            .values()
            .filter(|r| r.organization_id == *org_id)
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total_count = matching.len() as u64;
        let (offset, limit) = query.window();
        let records = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(SecretPage {
            records,
            total_count,
        })
    }

    async fn update(
        &self,
        org_id: &OrganizationId,
        id: &SecretId,
        patch: &SecretPatch,
    ) -> Result<SecretRecord, StoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::lock_poisoned())?;

        let row = rows
            .get_mut(&id.0)
            .filter(|r| r.organization_id == *org_id)
            .ok_or(StoreError::NotFound)?;

        if matches!(patch.kind, Some(kind) if kind != row.kind) {
            return Err(StoreError::ImmutableField);
        }
        if matches!(patch.organization_id, Some(org) if org != row.organization_id) {
            return Err(StoreError::ImmutableField);
        }

        if patch.name.is_none() && patch.envelope.is_none() {
            return Ok(row.clone());
        }

        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(envelope) = &patch.envelope {
            row.envelope = envelope.clone();
        }
        row.updated_at = Utc::now();

        Ok(row.clone())
    }

    async fn delete(&self, org_id: &OrganizationId, id: &SecretId) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::lock_poisoned())?;

        match rows.get(&id.0) {
            Some(r) if r.organization_id == *org_id => {
                rows.remove(&id.0);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_storage::{ActorId, Envelope, SecretKind};

    fn org() -> OrganizationId {
        OrganizationId(Uuid::new_v4())
    }

    fn actor() -> ActorId {
        ActorId(Uuid::new_v4())
    }

    fn envelope(fill: u8) -> Envelope {
        Envelope {
            ciphertext: vec![fill; 48],
            nonce: vec![fill; 24],
            tag: vec![fill; 16],
        }
    }

    fn params(org_id: OrganizationId, name: &str) -> InsertSecretParams {
        InsertSecretParams {
            organization_id: org_id,
            created_by: actor(),
            name: name.to_string(),
            kind: SecretKind::WebLogin,
            envelope: envelope(1),
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = MemoryStore::new();
        let org_id = org();

        let record = store.insert(&params(org_id, "Email")).await.unwrap();
        assert_eq!(record.name, "Email");
        assert_eq!(record.created_at, record.updated_at);

        let fetched = store.get_by_id(&org_id, &record.id).await.unwrap();
        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.envelope, record.envelope);
    }

    #[tokio::test]
    async fn get_is_org_scoped() {
        let store = MemoryStore::new();
        let org_a = org();
        let org_b = org();

        let record = store.insert(&params(org_a, "Email")).await.unwrap();

        // Same id under another organization looks nonexistent.
        let err = store.get_by_id(&org_b, &record.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn list_orders_newest_first_with_stable_pages() {
        let store = MemoryStore::new();
        let org_id = org();

        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d"] {
            ids.push(store.insert(&params(org_id, name)).await.unwrap().id);
        }

        let page1 = store
            .list_by_org(
                &org_id,
                &ListQuery {
                    offset: Some(0),
                    limit: Some(2),
                },
            )
            .await
            .unwrap();
        let page2 = store
            .list_by_org(
                &org_id,
                &ListQuery {
                    offset: Some(2),
                    limit: Some(2),
                },
            )
            .await
            .unwrap();

        assert_eq!(page1.total_count, 4);
        assert_eq!(page2.total_count, 4);

        let seen: Vec<SecretId> = page1
            .records
            .iter()
            .chain(page2.records.iter())
            .map(|r| r.id)
            .collect();
        assert_eq!(seen.len(), 4);

        // Newest first: reverse insertion order (v7 ids break created_at ties).
        let mut expected = ids.clone();
        expected.reverse();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn list_ignores_other_orgs() {
        let store = MemoryStore::new();
        let org_a = org();
        let org_b = org();

        store.insert(&params(org_a, "mine")).await.unwrap();
        store.insert(&params(org_b, "theirs")).await.unwrap();

        let page = store
            .list_by_org(&org_a, &ListQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.records[0].name, "mine");
    }

    #[tokio::test]
    async fn update_name_keeps_envelope() {
        let store = MemoryStore::new();
        let org_id = org();
        let record = store.insert(&params(org_id, "old")).await.unwrap();

        let updated = store
            .update(
                &org_id,
                &record.id,
                &SecretPatch {
                    name: Some("new".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "new");
        assert_eq!(updated.envelope, record.envelope);
        assert_eq!(updated.created_at, record.created_at);
        assert!(updated.updated_at >= record.updated_at);
    }

    #[tokio::test]
    async fn update_envelope_replaces_wholesale() {
        let store = MemoryStore::new();
        let org_id = org();
        let record = store.insert(&params(org_id, "s")).await.unwrap();

        let updated = store
            .update(
                &org_id,
                &record.id,
                &SecretPatch {
                    envelope: Some(envelope(7)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_ne!(updated.envelope, record.envelope);
        assert_eq!(updated.envelope, envelope(7));
        assert_eq!(updated.kind, record.kind);
    }

    #[tokio::test]
    async fn update_rejects_kind_change() {
        let store = MemoryStore::new();
        let org_id = org();
        let record = store.insert(&params(org_id, "s")).await.unwrap();

        let err = store
            .update(
                &org_id,
                &record.id,
                &SecretPatch {
                    kind: Some(SecretKind::SecureNote),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ImmutableField));

        // Echoing the current kind is fine.
        store
            .update(
                &org_id,
                &record.id,
                &SecretPatch {
                    kind: Some(SecretKind::WebLogin),
                    name: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_rejects_org_change() {
        let store = MemoryStore::new();
        let org_id = org();
        let record = store.insert(&params(org_id, "s")).await.unwrap();

        let err = store
            .update(
                &org_id,
                &record.id,
                &SecretPatch {
                    organization_id: Some(org()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ImmutableField));
    }

    #[tokio::test]
    async fn update_is_org_scoped() {
        let store = MemoryStore::new();
        let org_a = org();
        let org_b = org();
        let record = store.insert(&params(org_a, "s")).await.unwrap();

        let err = store
            .update(
                &org_b,
                &record.id,
                &SecretPatch {
                    name: Some("stolen".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn delete_then_delete_again() {
        let store = MemoryStore::new();
        let org_id = org();
        let record = store.insert(&params(org_id, "s")).await.unwrap();

        store.delete(&org_id, &record.id).await.unwrap();

        let err = store.delete(&org_id, &record.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        let err = store.get_by_id(&org_id, &record.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn delete_is_org_scoped() {
        let store = MemoryStore::new();
        let org_a = org();
        let org_b = org();
        let record = store.insert(&params(org_a, "s")).await.unwrap();

        let err = store.delete(&org_b, &record.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        // Still present under its own organization.
        store.get_by_id(&org_a, &record.id).await.unwrap();
    }
}
