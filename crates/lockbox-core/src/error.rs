//! Error taxonomy surfaced by the secret service.

use lockbox_storage::StoreError;
use thiserror::Error;

use crate::keyring::KeyError;
use crate::payload::PayloadError;

/// Typed failures of the five service operations. None of these are
/// transient; the service never retries.
#[derive(Debug, Error)]
pub enum SecretServiceError {
    /// No such record in this organization. Cross-org scoping failures land
    /// here too, so callers cannot probe for existence.
    #[error("secret not found")]
    NotFound,
    /// The gate denied the request (missing grant, or an actor/organization
    /// binding problem — the log carries the distinction).
    #[error("permission denied")]
    Forbidden,
    #[error(transparent)]
    MalformedPayload(#[from] PayloadError),
    /// Envelope failed authentication on decrypt. Possible tamper or
    /// corruption; logged as an integrity incident, never ignored.
    #[error("envelope authentication failed")]
    AuthenticationFailed,
    #[error("attempt to change an immutable field")]
    ImmutableField,
    /// Identity collision on insert; should not occur under v7 generation.
    #[error("secret id conflict")]
    Conflict,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("encryption failed")]
    Encrypt(#[from] lockbox_crypto::EncryptError),
    #[error("storage backend error: {0}")]
    Storage(String),
}

impl From<StoreError> for SecretServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => SecretServiceError::NotFound,
            StoreError::Conflict => SecretServiceError::Conflict,
            StoreError::ImmutableField => SecretServiceError::ImmutableField,
            StoreError::Backend(msg) => SecretServiceError::Storage(msg),
        }
    }
}
