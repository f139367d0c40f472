use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::*;
use uuid::Uuid;

use super::{MAX_BATCH_SIZE, components, portfolio as portfolio_db};
use crate::models::portfolio;
use crate::models::portfolio_project::{self, PortfolioProjectDto};
use crate::models::portfolio_project_branch;

/// Insert a manual selection of `project_uuid` into `portfolio`. The tree
/// root is copied onto the row for the hierarchy-wide unique index.
pub async fn insert_portfolio_project<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
    portfolio: &portfolio::Model,
    project_uuid: Uuid,
    now: DateTime<Utc>,
) -> Result<portfolio_project::Model, DbErr> {
    let new_selection = portfolio_project::ActiveModel {
        uuid: Set(uuid),
        portfolio_uuid: Set(portfolio.uuid),
        project_uuid: Set(project_uuid),
        root_uuid: Set(portfolio.root_uuid),
        created_at: Set(now),
    };

    new_selection.insert(db).await
}

/// Narrow a manual selection to one more branch.
pub async fn add_branch<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
    portfolio_project_uuid: Uuid,
    branch_uuid: Uuid,
    now: DateTime<Utc>,
) -> Result<portfolio_project_branch::Model, DbErr> {
    let new_branch = portfolio_project_branch::ActiveModel {
        uuid: Set(uuid),
        portfolio_project_uuid: Set(portfolio_project_uuid),
        branch_uuid: Set(branch_uuid),
        created_at: Set(now),
    };

    new_branch.insert(db).await
}

/// Manual selections of a single portfolio.
pub async fn select_portfolio_projects<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
) -> Result<Vec<PortfolioProjectDto>, DbErr> {
    let rows = portfolio_project::Entity::find()
        .filter(portfolio_project::Column::PortfolioUuid.eq(portfolio_uuid))
        .order_by_asc(portfolio_project::Column::CreatedAt)
        .all(db)
        .await?;

    to_dtos(db, rows).await
}

/// The selection of `project_uuid` in `portfolio_uuid`, if any.
pub async fn select_portfolio_project<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
    project_uuid: Uuid,
) -> Result<Option<PortfolioProjectDto>, DbErr> {
    let row = portfolio_project::Entity::find()
        .filter(portfolio_project::Column::PortfolioUuid.eq(portfolio_uuid))
        .filter(portfolio_project::Column::ProjectUuid.eq(project_uuid))
        .one(db)
        .await?;

    match row {
        Some(row) => Ok(to_dtos(db, vec![row]).await?.into_iter().next()),
        None => Ok(None),
    }
}

/// Every manual selection anywhere in the tree rooted at `root_uuid`, with
/// the key of the portfolio that owns it.
pub async fn select_all_projects_in_hierarchy<C: ConnectionTrait>(
    db: &C,
    root_uuid: Uuid,
) -> Result<Vec<PortfolioProjectDto>, DbErr> {
    let rows = portfolio_project::Entity::find()
        .filter(portfolio_project::Column::RootUuid.eq(root_uuid))
        .order_by_asc(portfolio_project::Column::CreatedAt)
        .all(db)
        .await?;

    to_dtos(db, rows).await
}

/// Remove one manual selection and its branch subset. Missing rows are not
/// an error.
pub async fn delete_project<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
    project_uuid: Uuid,
) -> Result<u64, DbErr> {
    let selections = portfolio_project::Entity::find()
        .filter(portfolio_project::Column::PortfolioUuid.eq(portfolio_uuid))
        .filter(portfolio_project::Column::ProjectUuid.eq(project_uuid))
        .all(db)
        .await?;

    delete_selections(db, selections).await
}

/// Remove every manual selection of a portfolio.
pub async fn delete_projects<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
) -> Result<u64, DbErr> {
    let selections = portfolio_project::Entity::find()
        .filter(portfolio_project::Column::PortfolioUuid.eq(portfolio_uuid))
        .all(db)
        .await?;

    delete_selections(db, selections).await
}

/// Remove every manual selection of every portfolio.
pub async fn delete_all_projects<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    portfolio_project_branch::Entity::delete_many().exec(db).await?;
    let result = portfolio_project::Entity::delete_many().exec(db).await?;
    Ok(result.rows_affected)
}

/// Drop one branch from a selection's branch subset. Missing rows are not an
/// error.
pub async fn delete_branch<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
    project_uuid: Uuid,
    branch_uuid: Uuid,
) -> Result<u64, DbErr> {
    let Some(selection) = portfolio_project::Entity::find()
        .filter(portfolio_project::Column::PortfolioUuid.eq(portfolio_uuid))
        .filter(portfolio_project::Column::ProjectUuid.eq(project_uuid))
        .one(db)
        .await?
    else {
        return Ok(0);
    };

    let result = portfolio_project_branch::Entity::delete_many()
        .filter(portfolio_project_branch::Column::PortfolioProjectUuid.eq(selection.uuid))
        .filter(portfolio_project_branch::Column::BranchUuid.eq(branch_uuid))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

async fn delete_selections<C: ConnectionTrait>(
    db: &C,
    selections: Vec<portfolio_project::Model>,
) -> Result<u64, DbErr> {
    if selections.is_empty() {
        return Ok(0);
    }

    let ids: Vec<Uuid> = selections.iter().map(|s| s.uuid).collect();
    let mut deleted = 0;
    for chunk in ids.chunks(MAX_BATCH_SIZE) {
        portfolio_project_branch::Entity::delete_many()
            .filter(
                portfolio_project_branch::Column::PortfolioProjectUuid
                    .is_in(chunk.iter().copied()),
            )
            .exec(db)
            .await?;
        let result = portfolio_project::Entity::delete_many()
            .filter(portfolio_project::Column::Uuid.is_in(chunk.iter().copied()))
            .exec(db)
            .await?;
        deleted += result.rows_affected;
    }

    Ok(deleted)
}

/// Join raw selection rows with portfolio keys, project keys, main branches
/// and branch subsets, using one batched query per table.
async fn to_dtos<C: ConnectionTrait>(
    db: &C,
    rows: Vec<portfolio_project::Model>,
) -> Result<Vec<PortfolioProjectDto>, DbErr> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let portfolio_uuids: HashSet<Uuid> = rows.iter().map(|r| r.portfolio_uuid).collect();
    let project_uuids: HashSet<Uuid> = rows.iter().map(|r| r.project_uuid).collect();
    let selection_ids: Vec<Uuid> = rows.iter().map(|r| r.uuid).collect();

    let portfolio_keys: HashMap<Uuid, String> = portfolio_db::select_by_uuids(db, &portfolio_uuids)
        .await?
        .into_iter()
        .map(|p| (p.uuid, p.key))
        .collect();
    let project_keys: HashMap<Uuid, String> = components::select_by_uuids(db, &project_uuids)
        .await?
        .into_iter()
        .map(|c| (c.uuid, c.key))
        .collect();
    let main_branches = components::select_main_branches(db, &project_uuids).await?;

    let mut branches: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
    for chunk in selection_ids.chunks(MAX_BATCH_SIZE) {
        let branch_rows = portfolio_project_branch::Entity::find()
            .filter(
                portfolio_project_branch::Column::PortfolioProjectUuid
                    .is_in(chunk.iter().copied()),
            )
            .all(db)
            .await?;
        for b in branch_rows {
            branches
                .entry(b.portfolio_project_uuid)
                .or_default()
                .insert(b.branch_uuid);
        }
    }

    Ok(rows
        .into_iter()
        .map(|r| PortfolioProjectDto {
            uuid: r.uuid,
            portfolio_uuid: r.portfolio_uuid,
            portfolio_key: portfolio_keys.get(&r.portfolio_uuid).cloned().unwrap_or_default(),
            project_uuid: r.project_uuid,
            project_key: project_keys.get(&r.project_uuid).cloned().unwrap_or_default(),
            main_branch_uuid: main_branches.get(&r.project_uuid).copied(),
            branch_uuids: branches.remove(&r.uuid).unwrap_or_default(),
            created_at: r.created_at,
        })
        .collect())
}
