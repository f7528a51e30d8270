//! Public API traits for the policy-groups module.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{AuthzEngineError, PolicyGroupsError};
use crate::models::{PermissionCheck, PutOutcome, Requestor, Verdict};

/// Public API trait for the named-policy-in-group resource.
///
/// Consumed by the request-handling layer; each method covers one verb
/// of the resource and runs the full resolve → plan → authorize → act
/// flow internally.
#[async_trait]
pub trait PolicyGroupsClient: Send + Sync {
    /// Fetch the document of the policy currently associated with the
    /// group (GET).
    ///
    /// # Errors
    ///
    /// - `NotFound` if no association exists for the pair
    /// - `Forbidden` if a required check is denied
    /// - `Internal` on storage or engine failures
    async fn fetch_named_policy(
        &self,
        requestor: &Requestor,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<Value, PolicyGroupsError>;

    /// Create or replace the association, storing the submitted
    /// revision document (PUT).
    ///
    /// # Errors
    ///
    /// - `Validation` if the document fails structural validation or
    ///   its `name` differs from the URL policy name
    /// - `Forbidden` if a required check is denied
    /// - `Conflict` if a concurrent creation raced on a natural key
    /// - `Internal` on storage or engine failures
    async fn put_named_policy(
        &self,
        requestor: &Requestor,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
        body: &[u8],
    ) -> Result<PutOutcome, PolicyGroupsError>;

    /// Remove the association and return the document that was active
    /// (DELETE). The policy, the group, and stored revisions remain.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no association exists for the pair
    /// - `Forbidden` if a required check is denied
    /// - `Internal` on storage or engine failures
    async fn delete_named_policy(
        &self,
        requestor: &Requestor,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<Value, PolicyGroupsError>;
}

/// External authorization engine collaborator.
///
/// The engine evaluates an ordered list of checks and either grants the
/// whole plan or reports the first denied entry. It also mints authz
/// identities for objects that are about to be created (the
/// create-in-container path).
#[async_trait]
pub trait AuthorizationEngine: Send + Sync {
    /// Evaluate a permission plan for a requestor.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport/infrastructure failures;
    /// denial is a [`Verdict`].
    async fn evaluate(
        &self,
        requestor: &Requestor,
        checks: &[PermissionCheck],
    ) -> Result<Verdict, AuthzEngineError>;

    /// Mint an authz identity owned by `requestor` for an object the
    /// caller is about to create.
    ///
    /// # Errors
    ///
    /// Returns an error on transport/infrastructure failures.
    async fn create_identity(&self, requestor: &Requestor) -> Result<Uuid, AuthzEngineError>;
}
