//! Record types shared by all storage backends.

mod ids;
mod secrets;

pub use ids::{ActorId, OrganizationId, SecretId};
pub use secrets::{
    Envelope, InsertSecretParams, ListQuery, ParseSecretKindError, SecretKind, SecretPage,
    SecretPatch, SecretRecord, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
