//! Actor context supplied by the upstream authentication layer.

use lockbox_storage::{ActorId, OrganizationId};

use crate::permission::Grant;

/// Closed set of identity kinds. The gate pattern-matches on this rather
/// than inferring the kind from structural shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorKind {
    /// Human user.
    User,
    /// Machine identity (service integration).
    Identity,
}

/// How the upstream layer authenticated the actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    /// Session JWT; only issued to human users.
    Jwt,
    /// Access token; only issued to machine identities.
    IdentityAccessToken,
}

/// Transient request context: who is acting, in which organization, and
/// with which resolved grants. Built by the caller from upstream auth data;
/// nothing here is persisted.
#[derive(Clone, Debug)]
pub struct Actor {
    pub kind: ActorKind,
    pub id: ActorId,
    pub organization_id: OrganizationId,
    pub auth_method: AuthMethod,
    pub grants: Vec<Grant>,
}

impl Actor {
    /// A human user authenticated via JWT.
    pub fn user(id: ActorId, organization_id: OrganizationId, grants: Vec<Grant>) -> Self {
        Self {
            kind: ActorKind::User,
            id,
            organization_id,
            auth_method: AuthMethod::Jwt,
            grants,
        }
    }

    /// A machine identity authenticated via access token.
    pub fn identity(id: ActorId, organization_id: OrganizationId, grants: Vec<Grant>) -> Self {
        Self {
            kind: ActorKind::Identity,
            id,
            organization_id,
            auth_method: AuthMethod::IdentityAccessToken,
            grants,
        }
    }
}
