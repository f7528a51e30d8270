//! Domain models for the policy-groups module.
//!
//! A *named policy in a policy group* is addressed by
//! `(org, policy name, group name)`. The types here describe the three
//! stages a request moves through: resolution of what exists
//! ([`AssociationLookup`]), the authorization plan derived from it
//! ([`PermissionPlan`]), and the write record handed to the persistence
//! layer ([`AssociationUpsert`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// HTTP verbs the named-policy resource understands.
///
/// `Post` is carried so the planner can fail loudly when the resource
/// layer dispatches a verb outside the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Put,
    Delete,
    Post,
}

impl Verb {
    /// The authorization action a verb maps to, or `None` for verbs the
    /// resource never dispatches.
    #[must_use]
    pub fn action(self) -> Option<Action> {
        match self {
            Verb::Get => Some(Action::Read),
            Verb::Put => Some(Action::Update),
            Verb::Delete => Some(Action::Delete),
            Verb::Post => None,
        }
    }

    /// Parse an HTTP method name (case-insensitive).
    #[must_use]
    pub fn from_method(method: &str) -> Option<Verb> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(Verb::Get),
            "PUT" => Some(Verb::Put),
            "DELETE" => Some(Verb::Delete),
            "POST" => Some(Verb::Post),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Post => "POST",
        }
    }
}

/// Actions evaluated by the external authorization engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Update,
    Delete,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// The kind of object a permission check targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Policy,
    PolicyGroup,
}

/// Containers against which create-permission is checked when the
/// object itself does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    Policies,
    PolicyGroups,
}

impl Container {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Container::Policies => "policies",
            Container::PolicyGroups => "policy_groups",
        }
    }
}

/// A single entry in a permission plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PermissionCheck {
    /// The requestor must hold `action` on an existing object.
    Object {
        object: ObjectKind,
        authz_id: Uuid,
        action: Action,
    },
    /// The object does not exist; the requestor must be allowed to
    /// create new objects of its kind in the named container.
    CreateInContainer { container: Container },
}

/// Outcome of permission planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionPlan {
    /// Checks the engine must grant before the request proceeds.
    Required(Vec<PermissionCheck>),
    /// Read/delete of a nonexistent association: respond 404 without
    /// ever consulting the authorization engine.
    HaltNotFound { message: String },
}

/// Existence state of one prerequisite object (policy or group).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    Found { id: Uuid, authz_id: Uuid },
    NotFound,
}

impl Prerequisite {
    #[must_use]
    pub fn authz_id(self) -> Option<Uuid> {
        match self {
            Prerequisite::Found { authz_id, .. } => Some(authz_id),
            Prerequisite::NotFound => None,
        }
    }
}

/// An association row as read back from storage, with the revision
/// document materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRecord {
    pub org_id: Uuid,
    pub policy_name: String,
    pub group_name: String,
    /// Revision currently active for this `(policy, group)` pair.
    pub revision_id: String,
    pub policy_id: Uuid,
    pub group_id: Uuid,
    /// Denormalized copy of the policy's authz identity.
    pub policy_authz_id: Uuid,
    /// Denormalized copy of the group's authz identity.
    pub group_authz_id: Uuid,
    pub last_modified_by: Uuid,
    /// The stored revision document.
    pub document: Value,
}

/// What exists for a `(policy, group)` pair.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupState {
    /// The association exists; its record carries everything the
    /// planner needs, no further lookups required.
    Found(AssociationRecord),
    /// No association; the prerequisites were resolved independently.
    Missing {
        policy: Prerequisite,
        group: Prerequisite,
    },
}

/// Result of resolving `(org, policy name, group name)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationLookup {
    pub org_id: Uuid,
    pub policy_name: String,
    pub group_name: String,
    pub state: LookupState,
}

/// A cookbook lock inside a validated policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookbookLock {
    pub identifier: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dotted_decimal_identifier: Option<String>,
}

/// A policy revision document that passed structural validation.
///
/// `raw` is the submitted document verbatim; it is what gets stored, so
/// a read after a write is structurally equal to the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidDocument {
    pub name: String,
    pub revision_id: String,
    pub run_list: Vec<String>,
    pub cookbook_locks: BTreeMap<String, CookbookLock>,
    pub raw: Value,
}

/// The authenticated actor a request runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requestor {
    pub actor_id: Uuid,
    /// Trusted internal caller; authorization checks are skipped.
    pub superuser: bool,
}

impl Requestor {
    #[must_use]
    pub fn new(actor_id: Uuid) -> Self {
        Self {
            actor_id,
            superuser: false,
        }
    }

    #[must_use]
    pub fn superuser(actor_id: Uuid) -> Self {
        Self {
            actor_id,
            superuser: true,
        }
    }
}

/// A policy or group identity resolved ahead of a write: either read
/// from the existing row or freshly minted for an object the write
/// will create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub name: String,
    pub authz_id: Uuid,
}

/// Everything the association writer needs for one upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationUpsert {
    pub org_id: Uuid,
    pub policy: ResolvedIdentity,
    pub group: ResolvedIdentity,
    pub document: ValidDocument,
}

/// Result of a PUT, decided by the resolution pass that preceded it.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    Created(Value),
    Updated(Value),
}

impl PutOutcome {
    #[must_use]
    pub fn document(&self) -> &Value {
        match self {
            PutOutcome::Created(doc) | PutOutcome::Updated(doc) => doc,
        }
    }
}

/// Verdict returned by the authorization engine for an evaluated plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Granted,
    /// At least one entry was denied; the first denied check is carried
    /// for diagnostics.
    Denied { check: PermissionCheck },
}
