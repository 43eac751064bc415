//! Organization-level permission rules and their evaluator.
//!
//! Grants are plain data evaluated by a pure function — no dynamically
//! dispatched rule objects — so the whole rule surface is auditable and
//! exhaustively testable. Evaluation is additive-only: a request is allowed
//! if any grant matches, denied otherwise; there are no deny overrides.

use std::str::FromStr;

use lockbox_storage::{ActorId, OrganizationId, SecretRecord};
use thiserror::Error;

use crate::actor::{Actor, ActorKind, AuthMethod};

/// Actions an actor can take on an organization subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrgAction {
    Read,
    Create,
    Edit,
    Delete,
}

impl OrgAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgAction::Read => "read",
            OrgAction::Create => "create",
            OrgAction::Edit => "edit",
            OrgAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OrgAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(OrgAction::Read),
            "create" => Ok(OrgAction::Create),
            "edit" => Ok(OrgAction::Edit),
            "delete" => Ok(OrgAction::Delete),
            _ => Err(format!("invalid action: {}", s)),
        }
    }
}

/// Subjects the organization rule language covers. Only `Secrets` gates this
/// crate's resources; the rest exist because role grants span the whole
/// organization surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrgSubject {
    Secrets,
    Member,
    Role,
    Settings,
    Billing,
}

impl OrgSubject {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgSubject::Secrets => "secrets",
            OrgSubject::Member => "member",
            OrgSubject::Role => "role",
            OrgSubject::Settings => "settings",
            OrgSubject::Billing => "billing",
        }
    }
}

impl std::fmt::Display for OrgSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgSubject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secrets" => Ok(OrgSubject::Secrets),
            "member" => Ok(OrgSubject::Member),
            "role" => Ok(OrgSubject::Role),
            "settings" => Ok(OrgSubject::Settings),
            "billing" => Ok(OrgSubject::Billing),
            _ => Err(format!("invalid subject: {}", s)),
        }
    }
}

/// Action side of a grant: one action or all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionMatcher {
    Any,
    Is(OrgAction),
}

impl ActionMatcher {
    fn matches(&self, action: OrgAction) -> bool {
        match self {
            ActionMatcher::Any => true,
            ActionMatcher::Is(a) => *a == action,
        }
    }
}

/// Subject side of a grant: one subject or all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubjectMatcher {
    Any,
    Is(OrgSubject),
}

impl SubjectMatcher {
    fn matches(&self, subject: OrgSubject) -> bool {
        match self {
            SubjectMatcher::Any => true,
            SubjectMatcher::Is(s) => *s == subject,
        }
    }
}

/// Optional qualifier narrowing a grant to particular resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Grant applies only to records the given actor created.
    CreatedBy(ActorId),
}

impl Condition {
    fn holds(&self, resource: &ResourceAttrs) -> bool {
        match self {
            Condition::CreatedBy(actor) => resource.created_by == *actor,
        }
    }
}

/// The attributes conditions are evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct ResourceAttrs {
    pub organization_id: OrganizationId,
    pub created_by: ActorId,
}

impl From<&SecretRecord> for ResourceAttrs {
    fn from(record: &SecretRecord) -> Self {
        Self {
            organization_id: record.organization_id,
            created_by: record.created_by,
        }
    }
}

/// One permission rule: (action matcher, subject matcher, optional
/// condition).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grant {
    pub action: ActionMatcher,
    pub subject: SubjectMatcher,
    pub condition: Option<Condition>,
}

impl Grant {
    /// Allow one action on one subject, unconditionally.
    pub fn allow(action: OrgAction, subject: OrgSubject) -> Self {
        Self {
            action: ActionMatcher::Is(action),
            subject: SubjectMatcher::Is(subject),
            condition: None,
        }
    }

    /// Allow every action on every subject (the admin wildcard).
    pub fn allow_all() -> Self {
        Self {
            action: ActionMatcher::Any,
            subject: SubjectMatcher::Any,
            condition: None,
        }
    }

    /// Narrow this grant to records created by the given actor.
    pub fn created_by(mut self, actor: ActorId) -> Self {
        self.condition = Some(Condition::CreatedBy(actor));
        self
    }
}

/// Pure grant evaluation.
///
/// With `resource: None` (create, list — no candidate record yet) a
/// conditioned grant matches; targeted operations re-evaluate once the
/// record is in hand so the condition actually bites.
pub fn evaluate(
    grants: &[Grant],
    action: OrgAction,
    subject: OrgSubject,
    resource: Option<&ResourceAttrs>,
) -> bool {
    grants.iter().any(|grant| {
        grant.action.matches(action)
            && grant.subject.matches(subject)
            && match (&grant.condition, resource) {
                (None, _) => true,
                (Some(_), None) => true,
                (Some(condition), Some(attrs)) => condition.holds(attrs),
            }
    })
}

/// Why the gate denied a request. Callers surface all of these as a generic
/// `Forbidden`; the distinction exists for logs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("actor is not bound to this organization")]
    OrganizationMismatch,
    #[error("authentication method does not match actor kind")]
    AuthMethodMismatch,
    #[error("no grant allows {action} on {subject}")]
    MissingGrant {
        action: OrgAction,
        subject: OrgSubject,
    },
}

/// The authorization gate: deny unless the actor is bound to the requested
/// organization, was authenticated the way its kind requires, and holds a
/// matching grant.
pub fn check_permission(
    actor: &Actor,
    action: OrgAction,
    subject: OrgSubject,
    organization_id: &OrganizationId,
    resource: Option<&ResourceAttrs>,
) -> Result<(), PermissionError> {
    if actor.organization_id != *organization_id {
        return Err(PermissionError::OrganizationMismatch);
    }

    match (actor.kind, actor.auth_method) {
        (ActorKind::User, AuthMethod::Jwt) => {}
        (ActorKind::Identity, AuthMethod::IdentityAccessToken) => {}
        _ => return Err(PermissionError::AuthMethodMismatch),
    }

    if evaluate(&actor.grants, action, subject, resource) {
        Ok(())
    } else {
        Err(PermissionError::MissingGrant { action, subject })
    }
}

/// Stock grant sets mirroring the built-in organization roles.
pub mod presets {
    use super::*;

    /// Full control over every subject.
    pub fn admin() -> Vec<Grant> {
        vec![Grant::allow_all()]
    }

    /// Full secrets access, read-only membership visibility.
    pub fn member() -> Vec<Grant> {
        vec![
            Grant::allow(OrgAction::Read, OrgSubject::Secrets),
            Grant::allow(OrgAction::Create, OrgSubject::Secrets),
            Grant::allow(OrgAction::Edit, OrgSubject::Secrets),
            Grant::allow(OrgAction::Delete, OrgSubject::Secrets),
            Grant::allow(OrgAction::Read, OrgSubject::Member),
        ]
    }

    /// No grants at all.
    pub fn no_access() -> Vec<Grant> {
        Vec::new()
    }
}
