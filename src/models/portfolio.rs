use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioError;

/// How the member projects of a portfolio are computed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "UPPERCASE")]
pub enum SelectionMode {
    #[sea_orm(string_value = "NONE")]
    None,
    #[sea_orm(string_value = "MANUAL")]
    Manual,
    #[sea_orm(string_value = "REGEXP")]
    Regexp,
    #[sea_orm(string_value = "TAGS")]
    Tags,
    /// Everything not selected by another node of the same tree.
    #[sea_orm(string_value = "REST")]
    Rest,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Manual => "MANUAL",
            Self::Regexp => "REGEXP",
            Self::Tags => "TAGS",
            Self::Rest => "REST",
        }
    }

    /// Modes whose selection is driven by `selection_expression`.
    pub fn uses_expression(&self) -> bool {
        matches!(self, Self::Regexp | Self::Tags)
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMode {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "MANUAL" => Ok(Self::Manual),
            "REGEXP" => Ok(Self::Regexp),
            "TAGS" => Ok(Self::Tags),
            "REST" => Ok(Self::Rest),
            _ => Err(PortfolioError::invalid_argument(format!(
                "unknown selection mode '{s}'"
            ))),
        }
    }
}

/// SeaORM entity for the `portfolios` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "portfolios")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    #[sea_orm(unique)]
    pub key: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub root_uuid: Uuid,
    pub parent_uuid: Option<Uuid>,
    pub selection_mode: SelectionMode,
    #[sea_orm(column_type = "Text", nullable)]
    pub selection_expression: Option<String>,
    pub is_private: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::portfolio_project::Entity")]
    Projects,
}

impl Related<super::portfolio_project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_root(&self) -> bool {
        self.parent_uuid.is_none()
    }

    /// Audit qualifier: `VIEW` for roots, `SUBVIEW` for everything below.
    pub fn qualifier(&self) -> &'static str {
        if self.is_root() { "VIEW" } else { "SUBVIEW" }
    }

    /// `is_root() <=> parent_uuid.is_none() <=> uuid == root_uuid`, and a
    /// node is never its own parent.
    pub fn check_root_identity(&self) -> Result<(), PortfolioError> {
        let claims_root = self.uuid == self.root_uuid;
        if self.is_root() != claims_root {
            return Err(PortfolioError::invalid_argument(format!(
                "portfolio '{}' has inconsistent root identity (uuid {}, root {}, parent {:?})",
                self.key, self.uuid, self.root_uuid, self.parent_uuid
            )));
        }
        if self.parent_uuid == Some(self.uuid) {
            return Err(PortfolioError::invalid_argument(format!(
                "portfolio '{}' cannot be its own parent",
                self.key
            )));
        }
        Ok(())
    }
}

// ── DTOs ──

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePortfolio {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_private")]
    pub is_private: bool,
}

fn default_private() -> bool {
    true
}

impl CreatePortfolio {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: None,
            is_private: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn public(mut self) -> Self {
        self.is_private = false;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePortfolio {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
}

/// Portfolio counts per selection mode, split between roots and
/// subportfolios.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModeCounts {
    pub portfolios: std::collections::BTreeMap<String, u64>,
    pub subportfolios: std::collections::BTreeMap<String, u64>,
}
