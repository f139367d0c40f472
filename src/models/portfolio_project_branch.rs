use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SeaORM entity for the `portfolio_proj_branches` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "portfolio_proj_branches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    pub portfolio_project_uuid: Uuid,
    pub branch_uuid: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portfolio_project::Entity",
        from = "Column::PortfolioProjectUuid",
        to = "super::portfolio_project::Column::Uuid"
    )]
    PortfolioProject,
}

impl Related<super::portfolio_project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PortfolioProject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
