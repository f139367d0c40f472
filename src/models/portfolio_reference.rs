use std::collections::BTreeSet;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SeaORM entity for the `portfolio_references` table.
///
/// One row per `(source, target, branch)`; an application reference scoped
/// to several branches is stored as several rows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "portfolio_references")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    pub portfolio_uuid: Uuid,
    pub reference_uuid: Uuid,
    pub branch_uuid: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portfolio::Entity",
        from = "Column::PortfolioUuid",
        to = "super::portfolio::Column::Uuid"
    )]
    Source,
}

impl Related<super::portfolio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetKind {
    Portfolio,
    Application,
}

/// A reference edge resolved against both of its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceDto {
    pub source_uuid: Uuid,
    pub source_root_uuid: Uuid,
    pub target_uuid: Uuid,
    /// `None` for applications, which are not portfolio trees.
    pub target_root_uuid: Option<Uuid>,
    pub target_key: String,
    pub target_name: String,
    pub target_kind: TargetKind,
    pub branch_uuids: BTreeSet<Uuid>,
    pub created_at: DateTimeUtc,
}
