//! Encrypted secret service core.
//!
//! Composes the payload codec, the envelope cipher, the record store, and
//! the authorization gate into the five caller-facing operations (create,
//! get, list, update, delete). Callers above this crate never see
//! ciphertext; callers below it never see plaintext.

mod actor;
mod error;
mod keyring;
mod payload;
mod permission;
mod service;

pub use actor::{Actor, ActorKind, AuthMethod};
pub use error::SecretServiceError;
pub use keyring::{KeyError, KeyProvider, StaticKeyring};
pub use payload::{PayloadError, SecretPayload};
pub use permission::{
    check_permission, evaluate, presets, ActionMatcher, Condition, Grant, OrgAction, OrgSubject,
    PermissionError, ResourceAttrs, SubjectMatcher,
};
pub use service::{
    CreateSecretRequest, SecretListView, SecretService, SecretView, UpdateSecretRequest,
};

pub use lockbox_storage::{
    ActorId, ListQuery, OrganizationId, SecretId, SecretKind, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
