//! Selection-mode changes and the rules that come with them:
//! at most one `REST` node per tree, and no manual selections outside
//! `MANUAL` mode.

use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use uuid::Uuid;

use crate::db::{portfolio as portfolio_db, projects as projects_db};
use crate::error::{PortfolioError, Result};
use crate::models::portfolio::{self, SelectionMode};
use crate::tree::PortfolioTree;

/// A validated mode change, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    pub mode: SelectionMode,
    pub expression: Option<String>,
}

impl SelectionRequest {
    /// Parse and validate before anything is touched. `REGEXP` and `TAGS`
    /// need a non-blank expression; other modes drop it.
    pub fn parse(mode: &str, expression: Option<&str>) -> Result<Self> {
        let mode: SelectionMode = mode.parse()?;
        let expression = expression.map(str::trim).filter(|e| !e.is_empty());

        let expression = if mode.uses_expression() {
            match expression {
                Some(e) => Some(e.to_string()),
                None => {
                    return Err(PortfolioError::invalid_argument(format!(
                        "selection mode {mode} requires an expression"
                    )));
                }
            }
        } else {
            None
        };

        Ok(Self { mode, expression })
    }
}

#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub portfolio: portfolio::Model,
    /// Other nodes of the tree that were in `REST` mode and got reset.
    pub reset: Vec<portfolio::Model>,
    /// Manual selections removed from the target.
    pub cleared_projects: u64,
}

/// Apply `request` to `target_uuid` within `tree`.
///
/// Other `REST` nodes are reset before the target changes, so no more than
/// one exists at any point of the transaction.
pub async fn update_selection_mode<C: ConnectionTrait>(
    db: &C,
    tree: &PortfolioTree,
    target_uuid: Uuid,
    request: SelectionRequest,
    now: DateTime<Utc>,
) -> Result<SelectionOutcome> {
    let mut target = tree
        .get(target_uuid)
        .cloned()
        .ok_or_else(|| PortfolioError::not_found("portfolio", target_uuid.to_string()))?;

    let mut reset = Vec::new();
    if request.mode == SelectionMode::Rest {
        for node in tree.level_order()? {
            if node.uuid == target_uuid || node.selection_mode != SelectionMode::Rest {
                continue;
            }
            let mut stale = node.clone();
            stale.selection_mode = SelectionMode::None;
            stale.selection_expression = None;
            stale.updated_at = now;
            tracing::debug!(portfolio = %stale.key, "Resetting previous REST portfolio to NONE");
            reset.push(portfolio_db::update_portfolio(db, stale).await?);
        }
    }

    target.selection_mode = request.mode;
    target.selection_expression = request.expression;
    target.updated_at = now;

    let cleared_projects = if target.selection_mode != SelectionMode::Manual {
        projects_db::delete_projects(db, target.uuid).await?
    } else {
        0
    };

    let portfolio = portfolio_db::update_portfolio(db, target).await?;

    Ok(SelectionOutcome {
        portfolio,
        reset,
        cleared_projects,
    })
}
