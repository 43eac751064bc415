//! Typed secret payloads and their canonical byte serialization.
//!
//! The serialized form is an internally-tagged JSON object; the tag doubles
//! as the shape discriminator and leaves room for future versioning. Field
//! order follows declaration order, so serialization is deterministic.

use lockbox_storage::SecretKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transient payload of a secret record. Never persisted in clear form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecretPayload {
    #[serde(rename = "WEB_LOGIN", rename_all = "camelCase")]
    WebLogin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        username: String,
        password: String,
    },
    #[serde(rename = "CREDIT_CARD", rename_all = "camelCase")]
    CreditCard {
        card_number: String,
        expiry_date: String,
        cvv: String,
    },
    #[serde(rename = "SECURE_NOTE", rename_all = "camelCase")]
    SecureNote { content: String },
}

impl SecretPayload {
    /// The record kind this payload belongs to.
    pub fn kind(&self) -> SecretKind {
        match self {
            SecretPayload::WebLogin { .. } => SecretKind::WebLogin,
            SecretPayload::CreditCard { .. } => SecretKind::CreditCard,
            SecretPayload::SecureNote { .. } => SecretKind::SecureNote,
        }
    }

    /// Canonical byte serialization used as encryption input.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PayloadError> {
        serde_json::to_vec(self).map_err(PayloadError::Serialize)
    }

    /// Parse bytes back into the payload of the given kind.
    ///
    /// Bytes that parse into a *different* variant are a `KindMismatch`,
    /// kept separate from `Malformed` because it points at record/envelope
    /// disagreement rather than a bad request.
    pub fn from_bytes(kind: SecretKind, bytes: &[u8]) -> Result<Self, PayloadError> {
        let payload: SecretPayload =
            serde_json::from_slice(bytes).map_err(PayloadError::Malformed)?;
        if payload.kind() != kind {
            return Err(PayloadError::KindMismatch {
                expected: kind,
                found: payload.kind(),
            });
        }
        Ok(payload)
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("payload kind {found} does not match record kind {expected}")]
    KindMismatch {
        expected: SecretKind,
        found: SecretKind,
    },
    #[error("payload serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}
