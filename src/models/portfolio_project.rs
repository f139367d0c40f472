use std::collections::BTreeSet;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SeaORM entity for the `portfolio_projects` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "portfolio_projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    pub portfolio_uuid: Uuid,
    pub project_uuid: Uuid,
    pub root_uuid: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portfolio::Entity",
        from = "Column::PortfolioUuid",
        to = "super::portfolio::Column::Uuid"
    )]
    Portfolio,
    #[sea_orm(has_many = "super::portfolio_project_branch::Entity")]
    Branches,
}

impl Related<super::portfolio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portfolio.def()
    }
}

impl Related<super::portfolio_project_branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// A manual selection joined with the keys of both sides and its branch
/// subset. Empty `branch_uuids` means the whole project (main branch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioProjectDto {
    pub uuid: Uuid,
    pub portfolio_uuid: Uuid,
    pub portfolio_key: String,
    pub project_uuid: Uuid,
    pub project_key: String,
    pub main_branch_uuid: Option<Uuid>,
    pub branch_uuids: BTreeSet<Uuid>,
    pub created_at: DateTimeUtc,
}
