use sea_orm::entity::prelude::*;
use time::OffsetDateTime;
use uuid::Uuid;

/// The single active association for a `(org, policy, group)` key.
///
/// `policy_authz_id` and `group_authz_id` are denormalized from the
/// referenced rows so authorization planning needs no extra lookups.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "policy_group_associations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::policy::Entity",
        from = "Column::PolicyId",
        to = "super::policy::Column::Id"
    )]
    Policy,
    #[sea_orm(
        belongs_to = "super::policy_group::Entity",
        from = "Column::GroupId",
        to = "super::policy_group::Column::Id"
    )]
    PolicyGroup,
}

impl Related<super::policy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Policy.def()
    }
}

impl Related<super::policy_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PolicyGroup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
