//! Manual project selection: a project is selected by at most one portfolio
//! of a given tree.

use sea_orm::ConnectionTrait;

use crate::collaborators::{Clock, UuidFactory};
use crate::db::{components, projects as projects_db};
use crate::error::{PortfolioError, Result};
use crate::models::component;
use crate::models::portfolio::{self, SelectionMode};
use crate::models::portfolio_project::PortfolioProjectDto;
use crate::models::project_branch;

/// The selection already holding `project_uuid`, if any.
pub fn find_holder(
    selections: &[PortfolioProjectDto],
    project_uuid: uuid::Uuid,
) -> Option<&PortfolioProjectDto> {
    selections.iter().find(|s| s.project_uuid == project_uuid)
}

/// Manually select `project` in `portfolio`.
///
/// The hierarchy-wide check comes first so that a conflict is reported as
/// such even when the target is not in `MANUAL` mode.
pub async fn append_project<C: ConnectionTrait>(
    db: &C,
    uuids: &dyn UuidFactory,
    clock: &dyn Clock,
    portfolio: &portfolio::Model,
    project: &component::Model,
) -> Result<PortfolioProjectDto> {
    let selections = projects_db::select_all_projects_in_hierarchy(db, portfolio.root_uuid).await?;
    if let Some(holder) = find_holder(&selections, project.uuid) {
        return Err(PortfolioError::AlreadySelected {
            project_key: project.key.clone(),
            holder: Some(holder.portfolio_key.clone()),
        });
    }

    if portfolio.selection_mode != SelectionMode::Manual {
        return Err(PortfolioError::invalid_argument(format!(
            "portfolio '{}' is in {} mode, projects can only be selected in MANUAL mode",
            portfolio.key, portfolio.selection_mode
        )));
    }

    let inserted = projects_db::insert_portfolio_project(
        db,
        uuids.new_uuid(),
        portfolio,
        project.uuid,
        clock.now(),
    )
    .await
    .map_err(PortfolioError::from)
    .map_err(|e| {
        if e.is_unique_violation() {
            PortfolioError::AlreadySelected {
                project_key: project.key.clone(),
                holder: None,
            }
        } else {
            e
        }
    })?;

    projects_db::select_portfolio_project(db, inserted.portfolio_uuid, inserted.project_uuid)
        .await?
        .ok_or_else(|| PortfolioError::integrity("manual selection vanished right after insert"))
}

/// Remove the selection of `project` from `portfolio`. Returns whether a row
/// was removed; absence is not an error.
pub async fn remove_project<C: ConnectionTrait>(
    db: &C,
    portfolio: &portfolio::Model,
    project: &component::Model,
) -> Result<bool> {
    Ok(projects_db::delete_project(db, portfolio.uuid, project.uuid).await? > 0)
}

/// Narrow the existing selection of `project` in `portfolio` to `branch` as
/// well. Re-adding a branch already present is a no-op.
pub async fn add_project_branch<C: ConnectionTrait>(
    db: &C,
    uuids: &dyn UuidFactory,
    clock: &dyn Clock,
    portfolio: &portfolio::Model,
    project: &component::Model,
    branch: &project_branch::Model,
) -> Result<PortfolioProjectDto> {
    if branch.project_uuid != project.uuid {
        return Err(PortfolioError::invalid_argument(format!(
            "branch '{}' does not belong to project '{}'",
            branch.key, project.key
        )));
    }

    let selection = projects_db::select_portfolio_project(db, portfolio.uuid, project.uuid)
        .await?
        .ok_or_else(|| {
            PortfolioError::not_found(
                "portfolio project",
                format!("{}/{}", portfolio.key, project.key),
            )
        })?;

    if selection.branch_uuids.contains(&branch.uuid) {
        return Ok(selection);
    }

    projects_db::add_branch(db, uuids.new_uuid(), selection.uuid, branch.uuid, clock.now()).await?;

    projects_db::select_portfolio_project(db, portfolio.uuid, project.uuid)
        .await?
        .ok_or_else(|| PortfolioError::integrity("manual selection vanished while adding a branch"))
}

/// Resolve a project component by key; applications do not qualify.
pub async fn resolve_project<C: ConnectionTrait>(db: &C, key: &str) -> Result<component::Model> {
    components::select_by_key_and_qualifier(db, key, component::Qualifier::Project)
        .await?
        .ok_or_else(|| PortfolioError::not_found("project", key))
}
