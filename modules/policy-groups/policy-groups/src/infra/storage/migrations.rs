//! Database migrations for the policy store.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250212_000001_create_policy_tables::Migration)]
    }
}

mod m20250212_000001_create_policy_tables {
    use sea_orm_migration::prelude::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Policies::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Policies::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Policies::OrgId).uuid().not_null())
                        .col(ColumnDef::new(Policies::Name).string().not_null())
                        .col(ColumnDef::new(Policies::AuthzId).uuid().not_null())
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("ux_policies_org_name")
                        .table(Policies::Table)
                        .col(Policies::OrgId)
                        .col(Policies::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PolicyGroups::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PolicyGroups::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PolicyGroups::OrgId).uuid().not_null())
                        .col(ColumnDef::new(PolicyGroups::Name).string().not_null())
                        .col(ColumnDef::new(PolicyGroups::AuthzId).uuid().not_null())
                        .col(
                            ColumnDef::new(PolicyGroups::LastModifiedBy)
                                .uuid()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("ux_policy_groups_org_name")
                        .table(PolicyGroups::Table)
                        .col(PolicyGroups::OrgId)
                        .col(PolicyGroups::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PolicyRevisions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PolicyRevisions::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PolicyRevisions::OrgId).uuid().not_null())
                        .col(
                            ColumnDef::new(PolicyRevisions::PolicyName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyRevisions::RevisionId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyRevisions::PolicyAuthzId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyRevisions::SerializedObject)
                                .binary()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyRevisions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("ux_policy_revisions_org_policy_revision")
                        .table(PolicyRevisions::Table)
                        .col(PolicyRevisions::OrgId)
                        .col(PolicyRevisions::PolicyName)
                        .col(PolicyRevisions::RevisionId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PolicyGroupAssociations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::OrgId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::PolicyName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::GroupName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::RevisionId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::PolicyId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::GroupId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::PolicyAuthzId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::GroupAuthzId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::LastModifiedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PolicyGroupAssociations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("ux_policy_group_associations_org_policy_group")
                        .table(PolicyGroupAssociations::Table)
                        .col(PolicyGroupAssociations::OrgId)
                        .col(PolicyGroupAssociations::PolicyName)
                        .col(PolicyGroupAssociations::GroupName)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PolicyGroupAssociations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PolicyRevisions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PolicyGroups::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Policies::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Policies {
        Table,
        Id,
        OrgId,
        Name,
        AuthzId,
    }

    #[derive(DeriveIden)]
    enum PolicyGroups {
        Table,
        Id,
        OrgId,
        Name,
        AuthzId,
        LastModifiedBy,
    }

    #[derive(DeriveIden)]
    enum PolicyRevisions {
        Table,
        Id,
        OrgId,
        PolicyName,
        RevisionId,
        PolicyAuthzId,
        SerializedObject,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PolicyGroupAssociations {
        Table,
        Id,
        OrgId,
        PolicyName,
        GroupName,
        RevisionId,
        PolicyId,
        GroupId,
        PolicyAuthzId,
        GroupAuthzId,
        LastModifiedBy,
        UpdatedAt,
    }
}
