//! Policy Groups Module
//!
//! Resolver and authorization-planning core for the named-policy-in-group
//! resource: which policy revision is active in which policy group, and
//! what the authorization engine must grant before a request may touch
//! that association.
//!
//! ## Architecture
//!
//! Strict layering, one-way dependencies only:
//!
//! - **Contract** (`policy-groups-sdk`): the [`PolicyGroupsClient`]
//!   trait, the [`AuthorizationEngine`] collaborator trait, and the
//!   resolution/planning/document models.
//! - **Domain** (`domain`): document validation, association
//!   resolution, permission planning, and the write path. Owns all
//!   business rules; knows nothing about HTTP.
//! - **Infrastructure** (`infra::storage`): sea-orm entities,
//!   migrations, and the repository implementation. All ORM specifics
//!   are contained here.
//!
//! The HTTP resource layer, the authorization engine, and JSON
//! request decoding are external collaborators; this crate is the
//! library they drive.

// === PUBLIC API (from SDK) ===
pub use policy_groups_sdk::{
    Action, AssociationLookup, AssociationRecord, AssociationUpsert, AuthorizationEngine,
    AuthzEngineError, Container, CookbookLock, LookupState, ObjectKind, PermissionCheck,
    PermissionPlan, PolicyGroupsClient, PolicyGroupsError, Prerequisite, PutOutcome, Requestor,
    ResolvedIdentity, ValidDocument, Verb, Verdict,
};

pub mod config;
pub mod domain;
pub mod infra;

pub use config::PolicyGroupsConfig;
pub use domain::local_client::LocalClient;
pub use domain::service::{Service, ServiceConfig};
