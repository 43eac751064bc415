//! Per-organization key material, modeled as an explicit dependency.
//!
//! The cipher itself is stateless; whoever constructs the service decides
//! where keys come from. One key per organization keeps the blast radius of
//! a compromised key to that organization.

use std::collections::HashMap;

use lockbox_crypto::SecretKey;
use lockbox_storage::OrganizationId;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("no encryption key configured for organization {0}")]
    MissingKey(OrganizationId),
}

/// Source of per-organization encryption keys.
pub trait KeyProvider: Send + Sync {
    fn key_for(&self, organization_id: &OrganizationId) -> Result<SecretKey, KeyError>;
}

/// Keyring with explicitly configured per-organization keys.
#[derive(Default)]
pub struct StaticKeyring {
    keys: HashMap<OrganizationId, Zeroizing<[u8; 32]>>,
}

impl StaticKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, organization_id: OrganizationId, key: &SecretKey) {
        self.keys
            .insert(organization_id, Zeroizing::new(*key.as_bytes()));
    }

    pub fn with_key(mut self, organization_id: OrganizationId, key: &SecretKey) -> Self {
        self.insert(organization_id, key);
        self
    }
}

impl KeyProvider for StaticKeyring {
    fn key_for(&self, organization_id: &OrganizationId) -> Result<SecretKey, KeyError> {
        self.keys
            .get(organization_id)
            .map(|bytes| SecretKey::from_bytes(bytes))
            .ok_or(KeyError::MissingKey(*organization_id))
    }
}
