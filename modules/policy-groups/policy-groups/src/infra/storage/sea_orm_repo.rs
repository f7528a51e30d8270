use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repo::{
    AssociationRow, NewAssociation, PolicyGroupRow, PolicyRow, PolicyStoreRepository,
};

use super::entity::policy::{self, Entity as PolicyEntity};
use super::entity::policy_group::{self, Entity as PolicyGroupEntity};
use super::entity::policy_group_association::{self, Entity as AssociationEntity};
use super::entity::policy_revision::{self, Entity as RevisionEntity};

/// ORM-based implementation of the [`PolicyStoreRepository`] trait.
#[derive(Clone)]
pub struct SeaOrmPolicyStore;

impl SeaOrmPolicyStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for SeaOrmPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Map database errors to domain errors; unique-key violations are
/// conflicts, everything else is a storage failure.
fn db_err(e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => DomainError::conflict(message),
        _ => DomainError::database(e.to_string()),
    }
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl PolicyStoreRepository for SeaOrmPolicyStore {
    async fn find_policy<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        name: &str,
    ) -> Result<Option<PolicyRow>, DomainError> {
        let found = PolicyEntity::find()
            .filter(policy::Column::OrgId.eq(org_id))
            .filter(policy::Column::Name.eq(name))
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(|m| PolicyRow {
            id: m.id,
            org_id: m.org_id,
            name: m.name,
            authz_id: m.authz_id,
        }))
    }

    async fn find_policy_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        name: &str,
    ) -> Result<Option<PolicyGroupRow>, DomainError> {
        let found = PolicyGroupEntity::find()
            .filter(policy_group::Column::OrgId.eq(org_id))
            .filter(policy_group::Column::Name.eq(name))
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(|m| PolicyGroupRow {
            id: m.id,
            org_id: m.org_id,
            name: m.name,
            authz_id: m.authz_id,
            last_modified_by: m.last_modified_by,
        }))
    }

    async fn find_association<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<Option<AssociationRow>, DomainError> {
        let found = AssociationEntity::find()
            .filter(policy_group_association::Column::OrgId.eq(org_id))
            .filter(policy_group_association::Column::PolicyName.eq(policy_name))
            .filter(policy_group_association::Column::GroupName.eq(group_name))
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(|m| AssociationRow {
            id: m.id,
            org_id: m.org_id,
            policy_name: m.policy_name,
            group_name: m.group_name,
            revision_id: m.revision_id,
            policy_id: m.policy_id,
            group_id: m.group_id,
            policy_authz_id: m.policy_authz_id,
            group_authz_id: m.group_authz_id,
            last_modified_by: m.last_modified_by,
        }))
    }

    async fn find_revision_blob<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        policy_name: &str,
        revision_id: &str,
    ) -> Result<Option<Vec<u8>>, DomainError> {
        let found = RevisionEntity::find()
            .filter(policy_revision::Column::OrgId.eq(org_id))
            .filter(policy_revision::Column::PolicyName.eq(policy_name))
            .filter(policy_revision::Column::RevisionId.eq(revision_id))
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(|m| m.serialized_object))
    }

    async fn create_policy<C: ConnectionTrait>(
        &self,
        conn: &C,
        row: PolicyRow,
    ) -> Result<(), DomainError> {
        let m = policy::ActiveModel {
            id: Set(row.id),
            org_id: Set(row.org_id),
            name: Set(row.name),
            authz_id: Set(row.authz_id),
        };
        PolicyEntity::insert(m).exec(conn).await.map_err(db_err)?;
        Ok(())
    }

    async fn create_policy_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        row: PolicyGroupRow,
    ) -> Result<(), DomainError> {
        let m = policy_group::ActiveModel {
            id: Set(row.id),
            org_id: Set(row.org_id),
            name: Set(row.name),
            authz_id: Set(row.authz_id),
            last_modified_by: Set(row.last_modified_by),
        };
        PolicyGroupEntity::insert(m)
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn insert_revision_if_absent<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        policy_name: &str,
        revision_id: &str,
        policy_authz_id: Uuid,
        compressed: Vec<u8>,
    ) -> Result<bool, DomainError> {
        let existing = self
            .find_revision_blob(conn, org_id, policy_name, revision_id)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let m = policy_revision::ActiveModel {
            id: Set(Uuid::new_v4()),
            org_id: Set(org_id),
            policy_name: Set(policy_name.to_owned()),
            revision_id: Set(revision_id.to_owned()),
            policy_authz_id: Set(policy_authz_id),
            serialized_object: Set(compressed),
            created_at: Set(OffsetDateTime::now_utc()),
        };
        match RevisionEntity::insert(m).exec(conn).await {
            Ok(_) => Ok(true),
            // Lost a benign race: same natural key means same content.
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn upsert_association<C: ConnectionTrait>(
        &self,
        conn: &C,
        row: NewAssociation,
    ) -> Result<(), DomainError> {
        let m = policy_group_association::ActiveModel {
            id: Set(Uuid::new_v4()),
            org_id: Set(row.org_id),
            policy_name: Set(row.policy_name),
            group_name: Set(row.group_name),
            revision_id: Set(row.revision_id),
            policy_id: Set(row.policy_id),
            group_id: Set(row.group_id),
            policy_authz_id: Set(row.policy_authz_id),
            group_authz_id: Set(row.group_authz_id),
            last_modified_by: Set(row.last_modified_by),
            updated_at: Set(OffsetDateTime::now_utc()),
        };

        let on_conflict = OnConflict::columns([
            policy_group_association::Column::OrgId,
            policy_group_association::Column::PolicyName,
            policy_group_association::Column::GroupName,
        ])
        .update_columns([
            policy_group_association::Column::RevisionId,
            policy_group_association::Column::PolicyId,
            policy_group_association::Column::GroupId,
            policy_group_association::Column::PolicyAuthzId,
            policy_group_association::Column::GroupAuthzId,
            policy_group_association::Column::LastModifiedBy,
            policy_group_association::Column::UpdatedAt,
        ])
        .to_owned();

        AssociationEntity::insert(m)
            .on_conflict(on_conflict)
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_association<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: Uuid,
        policy_name: &str,
        group_name: &str,
    ) -> Result<bool, DomainError> {
        let result = AssociationEntity::delete_many()
            .filter(policy_group_association::Column::OrgId.eq(org_id))
            .filter(policy_group_association::Column::PolicyName.eq(policy_name))
            .filter(policy_group_association::Column::GroupName.eq(group_name))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}
