use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Portfolios {
    Table,
    RootUuid,
    ParentUuid,
}

#[derive(DeriveIden)]
enum PortfolioReferences {
    Table,
    PortfolioUuid,
    ReferenceUuid,
    BranchUuid,
}

#[derive(DeriveIden)]
enum PortfolioProjects {
    Table,
    PortfolioUuid,
    ProjectUuid,
    RootUuid,
}

#[derive(DeriveIden)]
enum PortfolioProjBranches {
    Table,
    PortfolioProjectUuid,
    BranchUuid,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Whole-tree loads
        manager
            .create_index(
                Index::create()
                    .name("idx_portfolios_root_uuid")
                    .table(Portfolios::Table)
                    .col(Portfolios::RootUuid)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_portfolios_parent_uuid")
                    .table(Portfolios::Table)
                    .col(Portfolios::ParentUuid)
                    .to_owned(),
            )
            .await?;

        // A project is manually selected at most once per hierarchy
        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_projects_root_project_unique")
                    .table(PortfolioProjects::Table)
                    .col(PortfolioProjects::RootUuid)
                    .col(PortfolioProjects::ProjectUuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_projects_portfolio_uuid")
                    .table(PortfolioProjects::Table)
                    .col(PortfolioProjects::PortfolioUuid)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_proj_branches_unique")
                    .table(PortfolioProjBranches::Table)
                    .col(PortfolioProjBranches::PortfolioProjectUuid)
                    .col(PortfolioProjBranches::BranchUuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_references_unique")
                    .table(PortfolioReferences::Table)
                    .col(PortfolioReferences::PortfolioUuid)
                    .col(PortfolioReferences::ReferenceUuid)
                    .col(PortfolioReferences::BranchUuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Referencer lookups when a target is deleted
        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_references_reference_uuid")
                    .table(PortfolioReferences::Table)
                    .col(PortfolioReferences::ReferenceUuid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_portfolios_root_uuid",
            "idx_portfolios_parent_uuid",
            "idx_portfolio_projects_root_project_unique",
            "idx_portfolio_projects_portfolio_uuid",
            "idx_portfolio_proj_branches_unique",
            "idx_portfolio_references_unique",
            "idx_portfolio_references_reference_uuid",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        Ok(())
    }
}
