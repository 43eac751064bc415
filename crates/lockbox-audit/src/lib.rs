//! Audit logging abstraction for lockbox.
//!
//! This crate defines the `AuditLog` trait for persisting audit events and
//! the types representing auditable actions on secret records. Integrity
//! failures (envelope tag mismatch) get their own outcome so they can be
//! separated from ordinary not-found/permission noise when reviewing logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an audit log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditLogId(pub Uuid);

impl AuditLogId {
    /// Generate a new audit log ID using UUID v7 (time-ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AuditLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Categories of auditable actions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SecretCreate,
    SecretRead,
    SecretList,
    SecretUpdate,
    SecretDelete,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::SecretCreate => "secret.create",
            AuditAction::SecretRead => "secret.read",
            AuditAction::SecretList => "secret.list",
            AuditAction::SecretUpdate => "secret.update",
            AuditAction::SecretDelete => "secret.delete",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secret.create" => Ok(AuditAction::SecretCreate),
            "secret.read" => Ok(AuditAction::SecretRead),
            "secret.list" => Ok(AuditAction::SecretList),
            "secret.update" => Ok(AuditAction::SecretUpdate),
            "secret.delete" => Ok(AuditAction::SecretDelete),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

/// Result of an audited operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    PermissionDenied,
    NotFound,
    /// Envelope failed authentication on decrypt: possible tamper or
    /// corruption, never routine.
    IntegrityFailure,
    InvalidRequest,
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditOutcome::Success => "success",
            AuditOutcome::PermissionDenied => "permission_denied",
            AuditOutcome::NotFound => "not_found",
            AuditOutcome::IntegrityFailure => "integrity_failure",
            AuditOutcome::InvalidRequest => "invalid_request",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AuditOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AuditOutcome::Success),
            "permission_denied" => Ok(AuditOutcome::PermissionDenied),
            "not_found" => Ok(AuditOutcome::NotFound),
            "integrity_failure" => Ok(AuditOutcome::IntegrityFailure),
            "invalid_request" => Ok(AuditOutcome::InvalidRequest),
            _ => Err(format!("Unknown audit outcome: {}", s)),
        }
    }
}

/// An audit log entry representing a single auditable action.
///
/// Uses raw UUIDs so the entry serializes without depending on the storage
/// crate's typed ids.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditLogId,
    pub timestamp: DateTime<Utc>,
    /// Actor that performed the action
    pub actor_id: Uuid,
    /// Organization the operation was scoped to
    pub organization_id: Uuid,
    pub action: AuditAction,
    /// Identifier of the affected record, if one was named
    pub resource_id: Option<String>,
    pub outcome: AuditOutcome,
    /// Error message or additional context
    pub reason: Option<String>,
    /// Additional details as JSON
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn builder(actor_id: Uuid, organization_id: Uuid, action: AuditAction) -> AuditEventBuilder {
        AuditEventBuilder::new(actor_id, organization_id, action)
    }
}

/// Builder for constructing audit events
pub struct AuditEventBuilder {
    actor_id: Uuid,
    organization_id: Uuid,
    action: AuditAction,
    resource_id: Option<String>,
    outcome: AuditOutcome,
    reason: Option<String>,
    details: Option<serde_json::Value>,
}

impl AuditEventBuilder {
    pub fn new(actor_id: Uuid, organization_id: Uuid, action: AuditAction) -> Self {
        Self {
            actor_id,
            organization_id,
            action,
            resource_id: None,
            outcome: AuditOutcome::Success,
            reason: None,
            details: None,
        }
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn build(self) -> AuditEvent {
        AuditEvent {
            id: AuditLogId::new(),
            timestamp: Utc::now(),
            actor_id: self.actor_id,
            organization_id: self.organization_id,
            action: self.action,
            resource_id: self.resource_id,
            outcome: self.outcome,
            reason: self.reason,
            details: self.details,
        }
    }
}

/// Filter for querying audit logs
#[derive(Clone, Debug, Default)]
pub struct AuditFilter {
    pub organization_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub outcome: Option<AuditOutcome>,
    /// Maximum number of entries to return (newest first)
    pub limit: Option<u32>,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit backend error: {0}")]
    Backend(String),
}

/// Sink for audit events. Implementations must not lose the
/// integrity-failure outcome distinction.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;

    /// Query recorded events, newest first.
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, AuditError>;
}

/// In-memory audit log.
///
/// Entries only live within a single process; suitable for tests and
/// single-instance tools.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: std::sync::RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditError::Backend("audit lock poisoned".to_string()))?;
        entries.push(event);
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuditError::Backend("audit lock poisoned".to_string()))?;

        let mut out: Vec<AuditEvent> = entries
            .iter()
            .filter(|e| {
                filter
                    .organization_id
                    .map_or(true, |org| e.organization_id == org)
                    && filter.actor_id.map_or(true, |a| e.actor_id == a)
                    && filter.action.map_or(true, |a| e.action == a)
                    && filter.outcome.map_or(true, |o| e.outcome == o)
            })
            .cloned()
            .collect();
        out.reverse();
        if let Some(limit) = filter.limit {
            out.truncate(limit as usize);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(action: AuditAction, outcome: AuditOutcome) -> AuditEvent {
        AuditEvent::builder(Uuid::new_v4(), Uuid::new_v4(), action)
            .outcome(outcome)
            .build()
    }

    #[test]
    fn builder_defaults_to_success() {
        let e = AuditEvent::builder(Uuid::new_v4(), Uuid::new_v4(), AuditAction::SecretRead)
            .resource_id("some-id")
            .build();
        assert_eq!(e.outcome, AuditOutcome::Success);
        assert_eq!(e.resource_id.as_deref(), Some("some-id"));
        assert!(e.reason.is_none());
    }

    #[test]
    fn action_display_parse_round_trip() {
        for action in [
            AuditAction::SecretCreate,
            AuditAction::SecretRead,
            AuditAction::SecretList,
            AuditAction::SecretUpdate,
            AuditAction::SecretDelete,
        ] {
            let parsed: AuditAction = action.to_string().parse().unwrap();
            assert_eq!(action, parsed);
        }
    }

    #[test]
    fn outcome_display_parse_round_trip() {
        for outcome in [
            AuditOutcome::Success,
            AuditOutcome::PermissionDenied,
            AuditOutcome::NotFound,
            AuditOutcome::IntegrityFailure,
            AuditOutcome::InvalidRequest,
        ] {
            let parsed: AuditOutcome = outcome.to_string().parse().unwrap();
            assert_eq!(outcome, parsed);
        }
    }

    #[tokio::test]
    async fn memory_log_records_and_queries() {
        let log = MemoryAuditLog::new();

        log.record(event(AuditAction::SecretCreate, AuditOutcome::Success))
            .await
            .unwrap();
        log.record(event(AuditAction::SecretRead, AuditOutcome::IntegrityFailure))
            .await
            .unwrap();

        let all = log.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert_eq!(all[0].action, AuditAction::SecretRead);

        let incidents = log
            .query(&AuditFilter {
                outcome: Some(AuditOutcome::IntegrityFailure),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].action, AuditAction::SecretRead);
    }

    #[tokio::test]
    async fn memory_log_honors_limit() {
        let log = MemoryAuditLog::new();
        for _ in 0..5 {
            log.record(event(AuditAction::SecretList, AuditOutcome::Success))
                .await
                .unwrap();
        }

        let limited = log
            .query(&AuditFilter {
                limit: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 3);
    }
}
