//! Secret record rows and the parameter/patch/page types around them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ActorId, OrganizationId, SecretId};

/// Default page size for organization listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Upper bound on page size; larger requests are clamped, never honored.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// The closed set of secret payload shapes.
///
/// Immutable after creation; an update may replace the payload of a record
/// but never its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecretKind {
    #[serde(rename = "WEB_LOGIN")]
    WebLogin,
    #[serde(rename = "CREDIT_CARD")]
    CreditCard,
    #[serde(rename = "SECURE_NOTE")]
    SecureNote,
}

/// Error type for parsing SecretKind from its storage tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSecretKindError(pub String);

impl std::fmt::Display for ParseSecretKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid secret kind: {}", self.0)
    }
}

impl std::error::Error for ParseSecretKindError {}

impl FromStr for SecretKind {
    type Err = ParseSecretKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WEB_LOGIN" => Ok(SecretKind::WebLogin),
            "CREDIT_CARD" => Ok(SecretKind::CreditCard),
            "SECURE_NOTE" => Ok(SecretKind::SecureNote),
            _ => Err(ParseSecretKindError(s.to_string())),
        }
    }
}

impl SecretKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKind::WebLogin => "WEB_LOGIN",
            SecretKind::CreditCard => "CREDIT_CARD",
            SecretKind::SecureNote => "SECURE_NOTE",
        }
    }
}

impl std::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encrypted payload row (ciphertext + nonce + tag); no plaintext in storage.
///
/// Replaced wholesale on payload update, never partially mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>, // 24 bytes (XChaCha20 nonce)
    pub tag: Vec<u8>,   // 16 bytes (Poly1305 tag)
}

/// Persisted secret record.
#[derive(Clone, Debug)]
pub struct SecretRecord {
    pub id: SecretId,
    pub organization_id: OrganizationId,
    pub created_by: ActorId,
    pub name: String,
    pub kind: SecretKind,
    pub envelope: Envelope,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for inserting a secret record. The backend assigns the id and
/// both timestamps.
#[derive(Clone, Debug)]
pub struct InsertSecretParams {
    pub organization_id: OrganizationId,
    pub created_by: ActorId,
    pub name: String,
    pub kind: SecretKind,
    pub envelope: Envelope,
}

/// Patch for an existing record. Only `name` and `envelope` are mutable;
/// `kind`/`organization_id` are accepted solely so a caller echoing the
/// current value is not punished — a *different* value fails with
/// `StoreError::ImmutableField`.
#[derive(Clone, Debug, Default)]
pub struct SecretPatch {
    pub name: Option<String>,
    pub envelope: Option<Envelope>,
    pub kind: Option<SecretKind>,
    pub organization_id: Option<OrganizationId>,
}

/// Pagination window for [`SecretStore::list_by_org`].
///
/// [`SecretStore::list_by_org`]: crate::SecretStore::list_by_org
#[derive(Clone, Copy, Debug, Default)]
pub struct ListQuery {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    /// Resolve to a concrete (offset, limit) pair with the default applied
    /// and the limit clamped to [`MAX_PAGE_LIMIT`].
    pub fn window(&self) -> (u32, u32) {
        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
        (offset, limit)
    }
}

/// One page of records plus the organization-wide total.
#[derive(Clone, Debug)]
pub struct SecretPage {
    /// Window of records, `created_at` descending, ties broken by `id`
    /// descending.
    pub records: Vec<SecretRecord>,
    /// Full count for the organization, ignoring the window.
    pub total_count: u64,
}
