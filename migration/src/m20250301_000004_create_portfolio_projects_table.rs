use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Manual project selection. `root_uuid` is copied from the owning
/// portfolio so that hierarchy-wide uniqueness can be a plain unique index.
#[derive(DeriveIden)]
enum PortfolioProjects {
    Table,
    Uuid,
    PortfolioUuid,
    ProjectUuid,
    RootUuid,
    CreatedAt,
}

/// Branch subset of a manual selection, keyed by `portfolio_projects.uuid`.
#[derive(DeriveIden)]
enum PortfolioProjBranches {
    Table,
    Uuid,
    PortfolioProjectUuid,
    BranchUuid,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Portfolios {
    Table,
    Uuid,
}

#[derive(DeriveIden)]
enum Components {
    Table,
    Uuid,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PortfolioProjects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortfolioProjects::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PortfolioProjects::PortfolioUuid).uuid().not_null())
                    .col(ColumnDef::new(PortfolioProjects::ProjectUuid).uuid().not_null())
                    .col(ColumnDef::new(PortfolioProjects::RootUuid).uuid().not_null())
                    .col(
                        ColumnDef::new(PortfolioProjects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_projects_portfolio_uuid")
                            .from(PortfolioProjects::Table, PortfolioProjects::PortfolioUuid)
                            .to(Portfolios::Table, Portfolios::Uuid),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_projects_project_uuid")
                            .from(PortfolioProjects::Table, PortfolioProjects::ProjectUuid)
                            .to(Components::Table, Components::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PortfolioProjBranches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortfolioProjBranches::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PortfolioProjBranches::PortfolioProjectUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PortfolioProjBranches::BranchUuid).uuid().not_null())
                    .col(
                        ColumnDef::new(PortfolioProjBranches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_proj_branches_portfolio_project_uuid")
                            .from(
                                PortfolioProjBranches::Table,
                                PortfolioProjBranches::PortfolioProjectUuid,
                            )
                            .to(PortfolioProjects::Table, PortfolioProjects::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortfolioProjBranches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PortfolioProjects::Table).to_owned())
            .await
    }
}
