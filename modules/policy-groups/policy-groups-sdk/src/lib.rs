//! Policy-Groups SDK
//!
//! This crate provides the public contract for the `policy_groups`
//! module:
//!
//! - [`PolicyGroupsClient`] - public API trait for consumers
//! - [`AuthorizationEngine`] - collaborator trait for the external
//!   authorization engine
//! - [`AssociationLookup`], [`PermissionPlan`], [`ValidDocument`] -
//!   resolution, planning, and document models
//! - [`PolicyGroupsError`], [`AuthzEngineError`] - error types

pub mod api;
pub mod errors;
pub mod models;

pub use api::{AuthorizationEngine, PolicyGroupsClient};
pub use errors::{AuthzEngineError, PolicyGroupsError};
pub use models::{
    Action, AssociationLookup, AssociationRecord, AssociationUpsert, Container, CookbookLock,
    LookupState, ObjectKind, PermissionCheck, PermissionPlan, Prerequisite, PutOutcome, Requestor,
    ResolvedIdentity, ValidDocument, Verb, Verdict,
};
