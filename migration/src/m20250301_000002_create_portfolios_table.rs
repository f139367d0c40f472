use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Identifiers for the `portfolios` table and its columns.
///
/// The hierarchy lives in `root_uuid` / `parent_uuid`. No self-referencing
/// foreign key: subtrees are deleted explicitly once their closure is known.
#[derive(DeriveIden)]
enum Portfolios {
    Table,
    Uuid,
    Key,
    Name,
    Description,
    RootUuid,
    ParentUuid,
    SelectionMode,
    SelectionExpression,
    IsPrivate,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Portfolios::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Portfolios::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Portfolios::Key)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Portfolios::Name).string().not_null())
                    .col(ColumnDef::new(Portfolios::Description).text().null())
                    .col(ColumnDef::new(Portfolios::RootUuid).uuid().not_null())
                    .col(ColumnDef::new(Portfolios::ParentUuid).uuid().null())
                    .col(
                        ColumnDef::new(Portfolios::SelectionMode)
                            .string()
                            .not_null()
                            .default("NONE"),
                    )
                    .col(ColumnDef::new(Portfolios::SelectionExpression).text().null())
                    .col(
                        ColumnDef::new(Portfolios::IsPrivate)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Portfolios::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Portfolios::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Portfolios::Table).to_owned())
            .await
    }
}
