use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Projects and applications that portfolios can select or reference.
#[derive(DeriveIden)]
enum Components {
    Table,
    Uuid,
    Key,
    Name,
    Qualifier,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProjectBranches {
    Table,
    Uuid,
    ProjectUuid,
    Key,
    IsMain,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Components::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Components::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Components::Key)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Components::Name).string().not_null())
                    .col(ColumnDef::new(Components::Qualifier).string().not_null())
                    .col(
                        ColumnDef::new(Components::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProjectBranches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectBranches::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectBranches::ProjectUuid).uuid().not_null())
                    .col(ColumnDef::new(ProjectBranches::Key).string().not_null())
                    .col(
                        ColumnDef::new(ProjectBranches::IsMain)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ProjectBranches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_branches_project_uuid")
                            .from(ProjectBranches::Table, ProjectBranches::ProjectUuid)
                            .to(Components::Table, Components::Uuid)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectBranches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Components::Table).to_owned())
            .await
    }
}
