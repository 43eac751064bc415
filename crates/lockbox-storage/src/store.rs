//! The SecretStore trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait lockbox-core depends on.
///
/// Every method is **scoped by organization**: an `(org_id, id)` pair that
/// does not match both columns behaves exactly like a missing record.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    /// Persist a new record. Assigns a v7 id and stamps `created_at` /
    /// `updated_at`; returns the stored row.
    async fn insert(&self, params: &InsertSecretParams) -> Result<SecretRecord, StoreError>;

    /// Fetch a record by id within an organization.
    async fn get_by_id(
        &self,
        org_id: &OrganizationId,
        id: &SecretId,
    ) -> Result<SecretRecord, StoreError>;

    /// List an organization's records, `created_at` descending (ties broken
    /// by `id` descending), with the organization-wide total count.
    async fn list_by_org(
        &self,
        org_id: &OrganizationId,
        query: &ListQuery,
    ) -> Result<SecretPage, StoreError>;

    /// Apply a patch to a record. Refreshes `updated_at` whenever `name` or
    /// `envelope` changes; rejects attempts to change `kind` or
    /// `organization_id` with [`StoreError::ImmutableField`].
    async fn update(
        &self,
        org_id: &OrganizationId,
        id: &SecretId,
        patch: &SecretPatch,
    ) -> Result<SecretRecord, StoreError>;

    /// Hard-delete a record. A second delete of the same id is `NotFound`.
    async fn delete(&self, org_id: &OrganizationId, id: &SecretId) -> Result<(), StoreError>;
}
