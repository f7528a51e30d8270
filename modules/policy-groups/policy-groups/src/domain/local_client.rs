//! In-process implementation of the public [`PolicyGroupsClient`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use policy_groups_sdk::{PolicyGroupsClient, PolicyGroupsError, PutOutcome, Requestor};

use super::error::DomainError;
use super::repo::PolicyStoreRepository;
use super::service::Service;

/// Local client exposing the service under the SDK contract.
pub struct LocalClient<R: PolicyStoreRepository> {
    service: Arc<Service<R>>,
}

impl<R: PolicyStoreRepository> LocalClient<R> {
    #[must_use]
    pub fn new(service: Arc<Service<R>>) -> Self {
        Self { service }
    }
}

/// Map a domain error to the public error, logging internals first.
fn map_err(e: DomainError) -> PolicyGroupsError {
    if matches!(
        e,
        DomainError::Database { .. }
            | DomainError::AuthzEngine { .. }
            | DomainError::UnexpectedState { .. }
    ) {
        tracing::error!(error = %e, "internal failure in policy-groups operation");
    }
    e.into()
}

#[async_trait]
impl<R: PolicyStoreRepository + 'static> PolicyGroupsClient for LocalClient<R> {
    async fn fetch_named_policy(
        &self,
        requestor: &Requestor,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<Value, PolicyGroupsError> {
        self.service
            .fetch_named_policy(requestor, org_id, policy_name, group_name)
            .await
            .map_err(map_err)
    }

    async fn put_named_policy(
        &self,
        requestor: &Requestor,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
        body: &[u8],
    ) -> Result<PutOutcome, PolicyGroupsError> {
        self.service
            .put_named_policy(requestor, org_id, policy_name, group_name, body)
            .await
            .map_err(map_err)
    }

    async fn delete_named_policy(
        &self,
        requestor: &Requestor,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<Value, PolicyGroupsError> {
        self.service
            .delete_named_policy(requestor, org_id, policy_name, group_name)
            .await
            .map_err(map_err)
    }
}
