use async_trait::async_trait;
use sea_orm::ConnectionTrait;
use uuid::Uuid;

use super::error::DomainError;

/// A policy row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub authz_id: Uuid,
}

/// A policy group row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyGroupRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub authz_id: Uuid,
    pub last_modified_by: Uuid,
}

/// An association row as stored, without the materialized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub policy_name: String,
    pub group_name: String,
    pub revision_id: String,
    pub policy_id: Uuid,
    pub group_id: Uuid,
    pub policy_authz_id: Uuid,
    pub group_authz_id: Uuid,
    pub last_modified_by: Uuid,
}

/// Parameters for inserting or replacing the association row.
#[derive(Debug, Clone)]
pub struct NewAssociation {
    pub org_id: Uuid,
    pub policy_name: String,
    pub group_name: String,
    pub revision_id: String,
    pub policy_id: Uuid,
    pub group_id: Uuid,
    pub policy_authz_id: Uuid,
    pub group_authz_id: Uuid,
    pub last_modified_by: Uuid,
}

/// Point lookups and writes for the policy store.
///
/// All natural keys are `(org_id, name)` tuples; the storage schema
/// enforces them with unique indexes, so concurrent creations surface
/// as `Conflict` instead of duplicating rows.
#[async_trait]
pub trait PolicyStoreRepository: Send + Sync {
    async fn find_policy<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        name: &str,
    ) -> Result<Option<PolicyRow>, DomainError>;

    async fn find_policy_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        name: &str,
    ) -> Result<Option<PolicyGroupRow>, DomainError>;

    async fn find_association<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<Option<AssociationRow>, DomainError>;

    /// The compressed serialized document of one revision.
    async fn find_revision_blob<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        policy_name: &str,
        revision_id: &str,
    ) -> Result<Option<Vec<u8>>, DomainError>;

    async fn create_policy<C: ConnectionTrait>(
        &self,
        conn: &C,
        row: PolicyRow,
    ) -> Result<(), DomainError>;

    async fn create_policy_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        row: PolicyGroupRow,
    ) -> Result<(), DomainError>;

    /// Insert the revision unless one already exists for its natural
    /// key. Revisions are immutable; an existing row is left untouched.
    /// Returns whether a row was inserted.
    async fn insert_revision_if_absent<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        policy_name: &str,
        revision_id: &str,
        policy_authz_id: Uuid,
        compressed: Vec<u8>,
    ) -> Result<bool, DomainError>;

    /// Insert or replace the single active association for the row's
    /// natural key.
    async fn upsert_association<C: ConnectionTrait>(
        &self,
        conn: &C,
        row: NewAssociation,
    ) -> Result<(), DomainError>;

    /// Returns whether a row was deleted.
    async fn delete_association<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<bool, DomainError>;
}
