use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// `reference_uuid` points either at a portfolio or at an application
/// component, so it carries no foreign key.
#[derive(DeriveIden)]
enum PortfolioReferences {
    Table,
    Uuid,
    PortfolioUuid,
    ReferenceUuid,
    BranchUuid,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Portfolios {
    Table,
    Uuid,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PortfolioReferences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortfolioReferences::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PortfolioReferences::PortfolioUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PortfolioReferences::ReferenceUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PortfolioReferences::BranchUuid).uuid().null())
                    .col(
                        ColumnDef::new(PortfolioReferences::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_references_portfolio_uuid")
                            .from(PortfolioReferences::Table, PortfolioReferences::PortfolioUuid)
                            .to(Portfolios::Table, Portfolios::Uuid),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortfolioReferences::Table).to_owned())
            .await
    }
}
