use std::collections::{BTreeMap, HashSet};

use sea_orm::*;
use uuid::Uuid;

use super::MAX_BATCH_SIZE;
use crate::error;
use crate::models::portfolio;
use crate::models::{portfolio_project, portfolio_project_branch, portfolio_reference};

/// Insert a portfolio row. Root identity is checked before anything is
/// written.
pub async fn insert_portfolio<C: ConnectionTrait>(
    db: &C,
    p: portfolio::Model,
) -> error::Result<portfolio::Model> {
    p.check_root_identity()?;

    let new_portfolio = portfolio::ActiveModel {
        uuid: Set(p.uuid),
        key: Set(p.key),
        name: Set(p.name),
        description: Set(p.description),
        root_uuid: Set(p.root_uuid),
        parent_uuid: Set(p.parent_uuid),
        selection_mode: Set(p.selection_mode),
        selection_expression: Set(p.selection_expression),
        is_private: Set(p.is_private),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
    };

    Ok(new_portfolio.insert(db).await?)
}

/// Overwrite every mutable column of an existing portfolio.
pub async fn update_portfolio<C: ConnectionTrait>(
    db: &C,
    p: portfolio::Model,
) -> error::Result<portfolio::Model> {
    p.check_root_identity()?;

    let active = portfolio::ActiveModel {
        uuid: Unchanged(p.uuid),
        key: Set(p.key),
        name: Set(p.name),
        description: Set(p.description),
        root_uuid: Set(p.root_uuid),
        parent_uuid: Set(p.parent_uuid),
        selection_mode: Set(p.selection_mode),
        selection_expression: Set(p.selection_expression),
        is_private: Set(p.is_private),
        created_at: Unchanged(p.created_at),
        updated_at: Set(p.updated_at),
    };

    Ok(active.update(db).await?)
}

/// Fetch a single portfolio by uuid.
pub async fn select_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<portfolio::Model>, DbErr> {
    portfolio::Entity::find_by_id(uuid).one(db).await
}

/// Fetch a single portfolio by key.
pub async fn select_by_key<C: ConnectionTrait>(
    db: &C,
    key: &str,
) -> Result<Option<portfolio::Model>, DbErr> {
    portfolio::Entity::find()
        .filter(portfolio::Column::Key.eq(key))
        .one(db)
        .await
}

/// Fetch every portfolio whose uuid is in `uuids`, batching the lookup.
pub async fn select_by_uuids<C: ConnectionTrait>(
    db: &C,
    uuids: &HashSet<Uuid>,
) -> Result<Vec<portfolio::Model>, DbErr> {
    if uuids.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = uuids.iter().copied().collect();
    let mut found = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_BATCH_SIZE) {
        let rows = portfolio::Entity::find()
            .filter(portfolio::Column::Uuid.is_in(chunk.iter().copied()))
            .all(db)
            .await?;
        found.extend(rows);
    }

    Ok(found)
}

/// Fetch all portfolios, roots and subportfolios alike.
pub async fn select_all<C: ConnectionTrait>(db: &C) -> Result<Vec<portfolio::Model>, DbErr> {
    portfolio::Entity::find()
        .order_by_asc(portfolio::Column::CreatedAt)
        .order_by_asc(portfolio::Column::Uuid)
        .all(db)
        .await
}

/// Fetch every root portfolio.
pub async fn select_all_roots<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<portfolio::Model>, DbErr> {
    portfolio::Entity::find()
        .filter(portfolio::Column::ParentUuid.is_null())
        .order_by_asc(portfolio::Column::CreatedAt)
        .order_by_asc(portfolio::Column::Uuid)
        .all(db)
        .await
}

/// Fetch the flat node set of the tree rooted at `root_uuid`, root included.
/// Rows come back in creation order so that sibling order is stable.
pub async fn select_tree<C: ConnectionTrait>(
    db: &C,
    root_uuid: Uuid,
) -> Result<Vec<portfolio::Model>, DbErr> {
    portfolio::Entity::find()
        .filter(portfolio::Column::RootUuid.eq(root_uuid))
        .order_by_asc(portfolio::Column::CreatedAt)
        .order_by_asc(portfolio::Column::Uuid)
        .all(db)
        .await
}

/// Fetch the whole tree that contains `uuid`, wherever it sits in it.
pub async fn select_tree_of<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Vec<portfolio::Model>, DbErr> {
    match select_by_uuid(db, uuid).await? {
        Some(node) => select_tree(db, node.root_uuid).await,
        None => Ok(Vec::new()),
    }
}

/// `(key, uuid)` of every node in the tree whose root has `root_key`.
pub async fn select_uuids_by_key<C: ConnectionTrait>(
    db: &C,
    root_key: &str,
) -> Result<Vec<(String, Uuid)>, DbErr> {
    let Some(root) = select_by_key(db, root_key).await? else {
        return Ok(Vec::new());
    };

    Ok(select_tree(db, root.root_uuid)
        .await?
        .into_iter()
        .map(|p| (p.key, p.uuid))
        .collect())
}

/// Count root portfolios per selection mode.
pub async fn count_portfolios_by_mode<C: ConnectionTrait>(
    db: &C,
) -> Result<BTreeMap<String, u64>, DbErr> {
    count_by_mode(db, Condition::all().add(portfolio::Column::ParentUuid.is_null())).await
}

/// Count subportfolios per selection mode.
pub async fn count_subportfolios_by_mode<C: ConnectionTrait>(
    db: &C,
) -> Result<BTreeMap<String, u64>, DbErr> {
    count_by_mode(db, Condition::all().add(portfolio::Column::ParentUuid.is_not_null())).await
}

async fn count_by_mode<C: ConnectionTrait>(
    db: &C,
    scope: Condition,
) -> Result<BTreeMap<String, u64>, DbErr> {
    let rows: Vec<(String, i64)> = portfolio::Entity::find()
        .select_only()
        .column(portfolio::Column::SelectionMode)
        .column_as(portfolio::Column::Uuid.count(), "count")
        .filter(scope)
        .group_by(portfolio::Column::SelectionMode)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(mode, count)| (mode, Ord::max(count, 0) as u64))
        .collect())
}

/// Delete a precomputed closure of portfolios together with the references
/// touching them and the manual selections inside them.
///
/// The schema does not cascade, so `uuids` must already contain every
/// descendant of every node being removed.
pub async fn delete_closure<C: ConnectionTrait>(db: &C, uuids: &[Uuid]) -> Result<u64, DbErr> {
    let mut deleted = 0;

    for chunk in uuids.chunks(MAX_BATCH_SIZE) {
        portfolio_reference::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(portfolio_reference::Column::PortfolioUuid.is_in(chunk.iter().copied()))
                    .add(portfolio_reference::Column::ReferenceUuid.is_in(chunk.iter().copied())),
            )
            .exec(db)
            .await?;

        let selections: Vec<Uuid> = portfolio_project::Entity::find()
            .filter(portfolio_project::Column::PortfolioUuid.is_in(chunk.iter().copied()))
            .all(db)
            .await?
            .into_iter()
            .map(|pp| pp.uuid)
            .collect();

        for selection_chunk in selections.chunks(MAX_BATCH_SIZE) {
            portfolio_project_branch::Entity::delete_many()
                .filter(
                    portfolio_project_branch::Column::PortfolioProjectUuid
                        .is_in(selection_chunk.iter().copied()),
                )
                .exec(db)
                .await?;
        }

        portfolio_project::Entity::delete_many()
            .filter(portfolio_project::Column::PortfolioUuid.is_in(chunk.iter().copied()))
            .exec(db)
            .await?;

        let result = portfolio::Entity::delete_many()
            .filter(portfolio::Column::Uuid.is_in(chunk.iter().copied()))
            .exec(db)
            .await?;
        deleted += result.rows_affected;
    }

    Ok(deleted)
}
