use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Component kinds a portfolio can select (`TRK`) or reference (`APP`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Qualifier {
    #[sea_orm(string_value = "TRK")]
    Project,
    #[sea_orm(string_value = "APP")]
    Application,
}

/// SeaORM entity for the `components` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "components")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    #[sea_orm(unique)]
    pub key: String,
    pub name: String,
    pub qualifier: Qualifier,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::project_branch::Entity")]
    Branches,
}

impl Related<super::project_branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComponent {
    pub key: String,
    pub name: String,
    pub qualifier: Qualifier,
}
