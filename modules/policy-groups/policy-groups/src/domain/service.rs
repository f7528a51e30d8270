use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use policy_groups_sdk::{
    AssociationLookup, AssociationRecord, AssociationUpsert, AuthorizationEngine, LookupState,
    PermissionCheck, PermissionPlan, Prerequisite, PutOutcome, Requestor, ResolvedIdentity,
    ValidDocument, Verb, Verdict,
};

use super::codec::CompressionCodec;
use super::error::DomainError;
use super::planner;
use super::repo::{AssociationRow, NewAssociation, PolicyGroupRow, PolicyRow, PolicyStoreRepository};
use super::validate::{self, ValidationError};

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_document_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: 1_048_576,
        }
    }
}

/// Named-policy-in-group service.
///
/// # Design
///
/// The service owns the request flow the resource layer drives:
/// validate the inbound document, resolve what exists for the
/// `(policy, group)` pair, derive the permission plan, evaluate it
/// against the authorization engine, and only then touch storage.
/// Resolution and the eventual write are separate storage round trips;
/// unique natural keys make concurrent creations fail with a conflict
/// instead of duplicating rows.
pub struct Service<R: PolicyStoreRepository> {
    db: DatabaseConnection,
    repo: Arc<R>,
    authz: Arc<dyn AuthorizationEngine>,
    codec: Arc<dyn CompressionCodec>,
    config: ServiceConfig,
}

impl<R: PolicyStoreRepository> Service<R> {
    pub fn new(
        db: DatabaseConnection,
        repo: Arc<R>,
        authz: Arc<dyn AuthorizationEngine>,
        codec: Arc<dyn CompressionCodec>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            db,
            repo,
            authz,
            codec,
            config,
        }
    }

    /// Validate a raw request body as a policy revision document.
    ///
    /// # Errors
    ///
    /// Returns the structured [`ValidationError`] for the first failing
    /// field.
    pub fn validate_document(&self, raw: &[u8]) -> Result<ValidDocument, ValidationError> {
        validate::validate_document(raw, self.config.max_document_bytes)
    }

    /// Resolve the existence state of the `(policy, group)` triple.
    ///
    /// One lookup when the association exists (its row carries the
    /// denormalized authz ids and points at the stored document); two
    /// more lookups only when it does not, to resolve the prerequisites
    /// independently.
    #[instrument(skip(self), fields(org_id = %org_id, policy = policy_name, group = group_name))]
    pub async fn resolve_association(
        &self,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<AssociationLookup, DomainError> {
        let conn = &self.db;

        if let Some(row) = self
            .repo
            .find_association(conn, org_id, policy_name, group_name)
            .await?
        {
            let document = self.load_document(conn, &row).await?;
            tracing::debug!(revision_id = %row.revision_id, "association found");
            return Ok(AssociationLookup {
                org_id,
                policy_name: policy_name.to_owned(),
                group_name: group_name.to_owned(),
                state: LookupState::Found(record_from_row(row, document)),
            });
        }

        tracing::debug!("association not found, resolving prerequisites");
        let policy = match self.repo.find_policy(conn, org_id, policy_name).await? {
            Some(p) => Prerequisite::Found {
                id: p.id,
                authz_id: p.authz_id,
            },
            None => Prerequisite::NotFound,
        };
        let group = match self.repo.find_policy_group(conn, org_id, group_name).await? {
            Some(g) => Prerequisite::Found {
                id: g.id,
                authz_id: g.authz_id,
            },
            None => Prerequisite::NotFound,
        };

        Ok(AssociationLookup {
            org_id,
            policy_name: policy_name.to_owned(),
            group_name: group_name.to_owned(),
            state: LookupState::Missing { policy, group },
        })
    }

    /// Compute the permission plan for a verb against a lookup.
    ///
    /// # Errors
    ///
    /// See [`planner::plan`].
    pub fn plan_permissions(
        &self,
        verb: Verb,
        lookup: &AssociationLookup,
    ) -> Result<PermissionPlan, DomainError> {
        planner::plan(verb, lookup)
    }

    /// Fetch the document of the policy currently associated with the
    /// group (GET).
    ///
    /// # Errors
    ///
    /// `NotFound` when no association exists; `Forbidden` when a check
    /// is denied.
    #[instrument(skip(self, requestor), fields(org_id = %org_id, policy = policy_name, group = group_name))]
    pub async fn fetch_named_policy(
        &self,
        requestor: &Requestor,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<Value, DomainError> {
        let lookup = self
            .resolve_association(org_id, policy_name, group_name)
            .await?;
        match planner::plan(Verb::Get, &lookup)? {
            PermissionPlan::HaltNotFound { message } => Err(DomainError::not_found(message)),
            PermissionPlan::Required(checks) => {
                self.authorize(requestor, &checks).await?;
                let LookupState::Found(record) = lookup.state else {
                    return Err(DomainError::unexpected_state(
                        "permission checks produced for a missing association on GET",
                    ));
                };
                Ok(record.document)
            }
        }
    }

    /// Create or replace the association for `(policy, group)` (PUT).
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed body or a body whose name differs
    /// from the path; `Forbidden` when a check is denied; `Conflict`
    /// when a concurrent creation raced on a natural key.
    #[instrument(skip(self, requestor, body), fields(org_id = %org_id, policy = policy_name, group = group_name))]
    pub async fn put_named_policy(
        &self,
        requestor: &Requestor,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
        body: &[u8],
    ) -> Result<PutOutcome, DomainError> {
        let document = self.validate_document(body)?;
        if document.name != policy_name {
            return Err(ValidationError::NameMismatch {
                url: policy_name.to_owned(),
                body: document.name,
            }
            .into());
        }

        let lookup = self
            .resolve_association(org_id, policy_name, group_name)
            .await?;
        match planner::plan(Verb::Put, &lookup)? {
            PermissionPlan::HaltNotFound { .. } => Err(DomainError::unexpected_state(
                "planner produced a not-found halt for PUT",
            )),
            PermissionPlan::Required(checks) => {
                self.authorize(requestor, &checks).await?;

                let created = matches!(lookup.state, LookupState::Missing { .. });
                let (policy, group) = self
                    .resolve_identities(requestor, &lookup, policy_name, group_name)
                    .await?;
                let stored = document.raw.clone();
                self.upsert(
                    AssociationUpsert {
                        org_id,
                        policy,
                        group,
                        document,
                    },
                    requestor.actor_id,
                )
                .await?;

                tracing::info!(created, "named policy stored");
                Ok(if created {
                    PutOutcome::Created(stored)
                } else {
                    PutOutcome::Updated(stored)
                })
            }
        }
    }

    /// Remove the association and return the document that was active
    /// (DELETE). The policy, the group, and stored revisions remain.
    ///
    /// # Errors
    ///
    /// `NotFound` when no association exists; `Forbidden` when a check
    /// is denied.
    #[instrument(skip(self, requestor), fields(org_id = %org_id, policy = policy_name, group = group_name))]
    pub async fn delete_named_policy(
        &self,
        requestor: &Requestor,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<Value, DomainError> {
        let lookup = self
            .resolve_association(org_id, policy_name, group_name)
            .await?;
        match planner::plan(Verb::Delete, &lookup)? {
            PermissionPlan::HaltNotFound { message } => Err(DomainError::not_found(message)),
            PermissionPlan::Required(checks) => {
                self.authorize(requestor, &checks).await?;
                let LookupState::Found(record) = lookup.state else {
                    return Err(DomainError::unexpected_state(
                        "permission checks produced for a missing association on DELETE",
                    ));
                };
                let removed = self
                    .repo
                    .delete_association(&self.db, org_id, policy_name, group_name)
                    .await?;
                if !removed {
                    return Err(DomainError::not_found(format!(
                        "Cannot load policy {policy_name} in policy group {group_name}"
                    )));
                }
                tracing::info!(revision_id = %record.revision_id, "association removed");
                Ok(record.document)
            }
        }
    }

    /// Persist an association, creating any missing prerequisite rows
    /// and the revision inside a single transaction.
    ///
    /// # Errors
    ///
    /// `Conflict` when a unique natural key raced; `Database` on other
    /// storage failures. Nothing remains visible on failure.
    #[instrument(skip(self, upsert), fields(policy = %upsert.policy.name, group = %upsert.group.name, revision_id = %upsert.document.revision_id))]
    pub async fn upsert(
        &self,
        upsert: AssociationUpsert,
        actor_id: Uuid,
    ) -> Result<(), DomainError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;

        let policy = self
            .ensure_policy(&txn, upsert.org_id, &upsert.policy)
            .await?;
        let group = self
            .ensure_policy_group(&txn, upsert.org_id, &upsert.group, actor_id)
            .await?;
        self.store_revision(&txn, upsert.org_id, &policy, &upsert.document)
            .await?;
        self.repo
            .upsert_association(
                &txn,
                NewAssociation {
                    org_id: upsert.org_id,
                    policy_name: upsert.policy.name,
                    group_name: upsert.group.name,
                    revision_id: upsert.document.revision_id,
                    policy_id: policy.id,
                    group_id: group.id,
                    policy_authz_id: policy.authz_id,
                    group_authz_id: group.authz_id,
                    last_modified_by: actor_id,
                },
            )
            .await?;

        txn.commit()
            .await
            .map_err(|e| DomainError::database(e.to_string()))
    }

    async fn ensure_policy<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        identity: &ResolvedIdentity,
    ) -> Result<PolicyRow, DomainError> {
        if let Some(existing) = self.repo.find_policy(conn, org_id, &identity.name).await? {
            return Ok(existing);
        }
        let row = PolicyRow {
            id: Uuid::new_v4(),
            org_id,
            name: identity.name.clone(),
            authz_id: identity.authz_id,
        };
        self.repo.create_policy(conn, row.clone()).await?;
        tracing::debug!(policy = %row.name, "created policy");
        Ok(row)
    }

    async fn ensure_policy_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        identity: &ResolvedIdentity,
        actor_id: Uuid,
    ) -> Result<PolicyGroupRow, DomainError> {
        if let Some(existing) = self
            .repo
            .find_policy_group(conn, org_id, &identity.name)
            .await?
        {
            return Ok(existing);
        }
        let row = PolicyGroupRow {
            id: Uuid::new_v4(),
            org_id,
            name: identity.name.clone(),
            authz_id: identity.authz_id,
            last_modified_by: actor_id,
        };
        self.repo.create_policy_group(conn, row.clone()).await?;
        tracing::debug!(group = %row.name, "created policy group");
        Ok(row)
    }

    async fn store_revision<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        policy: &PolicyRow,
        document: &ValidDocument,
    ) -> Result<(), DomainError> {
        let serialized = serde_json::to_vec(&document.raw).map_err(|e| {
            DomainError::unexpected_state(format!("validated document failed to serialize: {e}"))
        })?;
        let compressed = self
            .codec
            .compress(&serialized)
            .map_err(|e| DomainError::database(format!("failed to compress revision: {e}")))?;
        let inserted = self
            .repo
            .insert_revision_if_absent(
                conn,
                org_id,
                &policy.name,
                &document.revision_id,
                policy.authz_id,
                compressed,
            )
            .await?;
        if inserted {
            tracing::debug!(revision_id = %document.revision_id, "stored new revision");
        }
        Ok(())
    }

    async fn authorize(
        &self,
        requestor: &Requestor,
        checks: &[PermissionCheck],
    ) -> Result<(), DomainError> {
        if requestor.superuser {
            tracing::debug!("superuser bypass, skipping authorization checks");
            return Ok(());
        }
        match self.authz.evaluate(requestor, checks).await? {
            Verdict::Granted => Ok(()),
            Verdict::Denied { check } => {
                tracing::info!(denied = ?check, "authorization denied");
                Err(DomainError::Forbidden)
            }
        }
    }

    async fn resolve_identities(
        &self,
        requestor: &Requestor,
        lookup: &AssociationLookup,
        policy_name: &str,
        group_name: &str,
    ) -> Result<(ResolvedIdentity, ResolvedIdentity), DomainError> {
        match &lookup.state {
            LookupState::Found(record) => Ok((
                ResolvedIdentity {
                    name: policy_name.to_owned(),
                    authz_id: record.policy_authz_id,
                },
                ResolvedIdentity {
                    name: group_name.to_owned(),
                    authz_id: record.group_authz_id,
                },
            )),
            LookupState::Missing { policy, group } => {
                let policy_authz_id = match policy {
                    Prerequisite::Found { authz_id, .. } => *authz_id,
                    Prerequisite::NotFound => self.authz.create_identity(requestor).await?,
                };
                let group_authz_id = match group {
                    Prerequisite::Found { authz_id, .. } => *authz_id,
                    Prerequisite::NotFound => self.authz.create_identity(requestor).await?,
                };
                Ok((
                    ResolvedIdentity {
                        name: policy_name.to_owned(),
                        authz_id: policy_authz_id,
                    },
                    ResolvedIdentity {
                        name: group_name.to_owned(),
                        authz_id: group_authz_id,
                    },
                ))
            }
        }
    }

    async fn load_document<C: ConnectionTrait>(
        &self,
        conn: &C,
        row: &AssociationRow,
    ) -> Result<Value, DomainError> {
        let blob = self
            .repo
            .find_revision_blob(conn, row.org_id, &row.policy_name, &row.revision_id)
            .await?
            .ok_or_else(|| {
                DomainError::unexpected_state(format!(
                    "association for policy {} in group {} references missing revision {}",
                    row.policy_name, row.group_name, row.revision_id
                ))
            })?;
        let bytes = self
            .codec
            .decompress(&blob)
            .map_err(|e| DomainError::database(format!("failed to decompress revision: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::unexpected_state(format!("stored revision is not valid JSON: {e}"))
        })
    }
}

fn record_from_row(row: AssociationRow, document: Value) -> AssociationRecord {
    AssociationRecord {
        org_id: row.org_id,
        policy_name: row.policy_name,
        group_name: row.group_name,
        revision_id: row.revision_id,
        policy_id: row.policy_id,
        group_id: row.group_id,
        policy_authz_id: row.policy_authz_id,
        group_authz_id: row.group_authz_id,
        last_modified_by: row.last_modified_by,
        document,
    }
}
