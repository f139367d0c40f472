use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::*;
use uuid::Uuid;

use super::{MAX_BATCH_SIZE, components, portfolio as portfolio_db};
use crate::models::component::Qualifier;
use crate::models::portfolio;
use crate::models::portfolio_reference::{self, ReferenceDto, TargetKind};

/// Insert one reference edge. `branch_uuid` scopes an application reference
/// to a single branch.
pub async fn insert_reference<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
    source_uuid: Uuid,
    target_uuid: Uuid,
    branch_uuid: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<portfolio_reference::Model, DbErr> {
    let new_reference = portfolio_reference::ActiveModel {
        uuid: Set(uuid),
        portfolio_uuid: Set(source_uuid),
        reference_uuid: Set(target_uuid),
        branch_uuid: Set(branch_uuid),
        created_at: Set(now),
    };

    new_reference.insert(db).await
}

/// Whether this exact `(source, target, branch)` edge already exists.
pub async fn reference_exists<C: ConnectionTrait>(
    db: &C,
    source_uuid: Uuid,
    target_uuid: Uuid,
    branch_uuid: Option<Uuid>,
) -> Result<bool, DbErr> {
    let mut query = portfolio_reference::Entity::find()
        .filter(portfolio_reference::Column::PortfolioUuid.eq(source_uuid))
        .filter(portfolio_reference::Column::ReferenceUuid.eq(target_uuid));
    query = match branch_uuid {
        Some(branch) => query.filter(portfolio_reference::Column::BranchUuid.eq(branch)),
        None => query.filter(portfolio_reference::Column::BranchUuid.is_null()),
    };

    Ok(query.count(db).await? > 0)
}

/// Every reference whose target is a portfolio.
pub async fn select_all_references_to_portfolios<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<ReferenceDto>, DbErr> {
    let rows = portfolio_reference::Entity::find().all(db).await?;
    Ok(resolve(db, rows)
        .await?
        .into_iter()
        .filter(|r| r.target_kind == TargetKind::Portfolio)
        .collect())
}

/// Every reference whose target is an application.
pub async fn select_all_references_to_applications<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<ReferenceDto>, DbErr> {
    let rows = portfolio_reference::Entity::find().all(db).await?;
    Ok(resolve(db, rows)
        .await?
        .into_iter()
        .filter(|r| r.target_kind == TargetKind::Application)
        .collect())
}

/// `(source_root_uuid, target_root_uuid)` for every portfolio-to-portfolio
/// reference.
pub async fn select_root_pairs<C: ConnectionTrait>(db: &C) -> Result<Vec<(Uuid, Uuid)>, DbErr> {
    Ok(select_all_references_to_portfolios(db)
        .await?
        .into_iter()
        .filter_map(|r| r.target_root_uuid.map(|target_root| (r.source_root_uuid, target_root)))
        .collect())
}

/// References whose source is any node of the tree rooted at `root_uuid`.
pub async fn select_references_in_hierarchy<C: ConnectionTrait>(
    db: &C,
    root_uuid: Uuid,
) -> Result<Vec<ReferenceDto>, DbErr> {
    let tree: Vec<Uuid> = portfolio_db::select_tree(db, root_uuid)
        .await?
        .into_iter()
        .map(|p| p.uuid)
        .collect();

    let mut rows = Vec::new();
    for chunk in tree.chunks(MAX_BATCH_SIZE) {
        rows.extend(
            portfolio_reference::Entity::find()
                .filter(portfolio_reference::Column::PortfolioUuid.is_in(chunk.iter().copied()))
                .all(db)
                .await?,
        );
    }

    resolve(db, rows).await
}

pub async fn select_all_references_to_portfolios_in_hierarchy<C: ConnectionTrait>(
    db: &C,
    root_uuid: Uuid,
) -> Result<Vec<ReferenceDto>, DbErr> {
    Ok(select_references_in_hierarchy(db, root_uuid)
        .await?
        .into_iter()
        .filter(|r| r.target_kind == TargetKind::Portfolio)
        .collect())
}

pub async fn select_all_references_to_applications_in_hierarchy<C: ConnectionTrait>(
    db: &C,
    root_uuid: Uuid,
) -> Result<Vec<ReferenceDto>, DbErr> {
    Ok(select_references_in_hierarchy(db, root_uuid)
        .await?
        .into_iter()
        .filter(|r| r.target_kind == TargetKind::Application)
        .collect())
}

/// Uuids of everything `portfolio_uuid` references directly.
pub async fn select_reference_uuids<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
) -> Result<BTreeSet<Uuid>, DbErr> {
    Ok(portfolio_reference::Entity::find()
        .filter(portfolio_reference::Column::PortfolioUuid.eq(portfolio_uuid))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.reference_uuid)
        .collect())
}

/// Uuids of the applications `portfolio_uuid` references directly.
pub async fn select_application_reference_uuids<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
) -> Result<BTreeSet<Uuid>, DbErr> {
    let rows = portfolio_reference::Entity::find()
        .filter(portfolio_reference::Column::PortfolioUuid.eq(portfolio_uuid))
        .all(db)
        .await?;

    Ok(resolve(db, rows)
        .await?
        .into_iter()
        .filter(|r| r.target_kind == TargetKind::Application)
        .map(|r| r.target_uuid)
        .collect())
}

/// The reference from `portfolio_uuid` to the portfolio with `target_key`.
pub async fn select_reference_to_portfolio<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
    target_key: &str,
) -> Result<Option<ReferenceDto>, DbErr> {
    Ok(select_reference(db, portfolio_uuid, target_key)
        .await?
        .filter(|r| r.target_kind == TargetKind::Portfolio))
}

/// The reference from `portfolio_uuid` to the application with `app_key`,
/// with all of its branches folded into `branch_uuids`.
pub async fn select_reference_to_app<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
    app_key: &str,
) -> Result<Option<ReferenceDto>, DbErr> {
    Ok(select_reference(db, portfolio_uuid, app_key)
        .await?
        .filter(|r| r.target_kind == TargetKind::Application))
}

/// The reference from `portfolio_uuid` to whatever carries `target_key`.
pub async fn select_reference<C: ConnectionTrait>(
    db: &C,
    portfolio_uuid: Uuid,
    target_key: &str,
) -> Result<Option<ReferenceDto>, DbErr> {
    let target_uuid = if let Some(p) = portfolio_db::select_by_key(db, target_key).await? {
        p.uuid
    } else if let Some(app) =
        components::select_by_key_and_qualifier(db, target_key, Qualifier::Application).await?
    {
        app.uuid
    } else {
        return Ok(None);
    };

    let rows = portfolio_reference::Entity::find()
        .filter(portfolio_reference::Column::PortfolioUuid.eq(portfolio_uuid))
        .filter(portfolio_reference::Column::ReferenceUuid.eq(target_uuid))
        .all(db)
        .await?;

    Ok(resolve(db, rows).await?.into_iter().next())
}

/// Portfolios holding a reference to `target_uuid`.
pub async fn select_referencers<C: ConnectionTrait>(
    db: &C,
    target_uuid: Uuid,
) -> Result<Vec<portfolio::Model>, DbErr> {
    let sources: HashSet<Uuid> = portfolio_reference::Entity::find()
        .filter(portfolio_reference::Column::ReferenceUuid.eq(target_uuid))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.portfolio_uuid)
        .collect();

    portfolio_db::select_by_uuids(db, &sources).await
}

/// Roots of the trees holding a reference to `target_uuid`.
pub async fn select_root_of_referencers<C: ConnectionTrait>(
    db: &C,
    target_uuid: Uuid,
) -> Result<Vec<portfolio::Model>, DbErr> {
    let roots: HashSet<Uuid> = select_referencers(db, target_uuid)
        .await?
        .into_iter()
        .map(|p| p.root_uuid)
        .collect();

    portfolio_db::select_by_uuids(db, &roots).await
}

/// Root uuids of the trees holding a reference to any of `target_uuids`.
pub async fn select_root_uuids_of_referencers_to_any<C: ConnectionTrait>(
    db: &C,
    target_uuids: &[Uuid],
) -> Result<HashSet<Uuid>, DbErr> {
    let mut sources = HashSet::new();
    for chunk in target_uuids.chunks(MAX_BATCH_SIZE) {
        let rows = portfolio_reference::Entity::find()
            .filter(portfolio_reference::Column::ReferenceUuid.is_in(chunk.iter().copied()))
            .all(db)
            .await?;
        sources.extend(rows.into_iter().map(|r| r.portfolio_uuid));
    }

    Ok(portfolio_db::select_by_uuids(db, &sources)
        .await?
        .into_iter()
        .map(|p| p.root_uuid)
        .collect())
}

/// Roots of the trees holding a reference scoped to application branch
/// `branch_uuid`.
pub async fn select_root_of_referencers_to_app_branch<C: ConnectionTrait>(
    db: &C,
    branch_uuid: Uuid,
) -> Result<Vec<portfolio::Model>, DbErr> {
    let sources: HashSet<Uuid> = portfolio_reference::Entity::find()
        .filter(portfolio_reference::Column::BranchUuid.eq(branch_uuid))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.portfolio_uuid)
        .collect();

    let roots: HashSet<Uuid> = portfolio_db::select_by_uuids(db, &sources)
        .await?
        .into_iter()
        .map(|p| p.root_uuid)
        .collect();

    portfolio_db::select_by_uuids(db, &roots).await
}

/// Delete every reference pointing at `target_uuid`.
pub async fn delete_references_to<C: ConnectionTrait>(
    db: &C,
    target_uuid: Uuid,
) -> Result<u64, DbErr> {
    let result = portfolio_reference::Entity::delete_many()
        .filter(portfolio_reference::Column::ReferenceUuid.eq(target_uuid))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Delete the reference from `source_uuid` to `target_uuid`, all branches.
pub async fn delete_reference<C: ConnectionTrait>(
    db: &C,
    source_uuid: Uuid,
    target_uuid: Uuid,
) -> Result<u64, DbErr> {
    let result = portfolio_reference::Entity::delete_many()
        .filter(portfolio_reference::Column::PortfolioUuid.eq(source_uuid))
        .filter(portfolio_reference::Column::ReferenceUuid.eq(target_uuid))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Delete one branch of an application reference.
pub async fn delete_reference_branch<C: ConnectionTrait>(
    db: &C,
    source_uuid: Uuid,
    target_uuid: Uuid,
    branch_uuid: Uuid,
) -> Result<u64, DbErr> {
    let result = portfolio_reference::Entity::delete_many()
        .filter(portfolio_reference::Column::PortfolioUuid.eq(source_uuid))
        .filter(portfolio_reference::Column::ReferenceUuid.eq(target_uuid))
        .filter(portfolio_reference::Column::BranchUuid.eq(branch_uuid))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

pub async fn delete_all_references<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    let result = portfolio_reference::Entity::delete_many().exec(db).await?;
    Ok(result.rows_affected)
}

/// Resolve raw rows against portfolios and application components, folding
/// rows of the same `(source, target)` into one DTO. Rows whose endpoints no
/// longer resolve are dropped.
async fn resolve<C: ConnectionTrait>(
    db: &C,
    rows: Vec<portfolio_reference::Model>,
) -> Result<Vec<ReferenceDto>, DbErr> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let endpoint_uuids: HashSet<Uuid> = rows
        .iter()
        .flat_map(|r| [r.portfolio_uuid, r.reference_uuid])
        .collect();
    let portfolios: HashMap<Uuid, portfolio::Model> =
        portfolio_db::select_by_uuids(db, &endpoint_uuids)
            .await?
            .into_iter()
            .map(|p| (p.uuid, p))
            .collect();

    let unresolved: HashSet<Uuid> = rows
        .iter()
        .map(|r| r.reference_uuid)
        .filter(|uuid| !portfolios.contains_key(uuid))
        .collect();
    let applications: HashMap<Uuid, _> = components::select_by_uuids(db, &unresolved)
        .await?
        .into_iter()
        .filter(|c| c.qualifier == Qualifier::Application)
        .map(|c| (c.uuid, c))
        .collect();

    let mut folded: BTreeMap<(Uuid, Uuid), ReferenceDto> = BTreeMap::new();
    for row in rows {
        let Some(source) = portfolios.get(&row.portfolio_uuid) else {
            continue;
        };

        let key = (row.portfolio_uuid, row.reference_uuid);
        if !folded.contains_key(&key) {
            let dto = if let Some(target) = portfolios.get(&row.reference_uuid) {
                ReferenceDto {
                    source_uuid: source.uuid,
                    source_root_uuid: source.root_uuid,
                    target_uuid: target.uuid,
                    target_root_uuid: Some(target.root_uuid),
                    target_key: target.key.clone(),
                    target_name: target.name.clone(),
                    target_kind: TargetKind::Portfolio,
                    branch_uuids: BTreeSet::new(),
                    created_at: row.created_at,
                }
            } else if let Some(app) = applications.get(&row.reference_uuid) {
                ReferenceDto {
                    source_uuid: source.uuid,
                    source_root_uuid: source.root_uuid,
                    target_uuid: app.uuid,
                    target_root_uuid: None,
                    target_key: app.key.clone(),
                    target_name: app.name.clone(),
                    target_kind: TargetKind::Application,
                    branch_uuids: BTreeSet::new(),
                    created_at: row.created_at,
                }
            } else {
                continue;
            };
            folded.insert(key, dto);
        }

        if let (Some(branch), Some(entry)) = (row.branch_uuid, folded.get_mut(&key)) {
            entry.branch_uuids.insert(branch);
        }
    }

    Ok(folded.into_values().collect())
}
