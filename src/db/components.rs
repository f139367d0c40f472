use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::*;
use uuid::Uuid;

use super::{MAX_BATCH_SIZE, portfolio as portfolio_db};
use crate::error::{self, PortfolioError};
use crate::models::component::{self, CreateComponent, Qualifier};
use crate::models::project_branch;

/// Register a project or application. A main branch is created alongside.
///
/// Components share their key space with portfolios, so a key already used
/// by a portfolio is rejected.
pub async fn insert_component<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
    main_branch_uuid: Uuid,
    input: CreateComponent,
    now: DateTime<Utc>,
) -> error::Result<component::Model> {
    if portfolio_db::select_by_key(db, &input.key).await?.is_some() {
        return Err(PortfolioError::invalid_argument(format!(
            "key '{}' is already used by a portfolio",
            input.key
        )));
    }

    let new_component = component::ActiveModel {
        uuid: Set(uuid),
        key: Set(input.key),
        name: Set(input.name),
        qualifier: Set(input.qualifier),
        created_at: Set(now),
    };
    let inserted = new_component.insert(db).await?;

    insert_branch(db, main_branch_uuid, uuid, "main", true, now).await?;

    Ok(inserted)
}

/// Insert a branch of an existing project or application.
pub async fn insert_branch<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
    project_uuid: Uuid,
    key: &str,
    is_main: bool,
    now: DateTime<Utc>,
) -> Result<project_branch::Model, DbErr> {
    let new_branch = project_branch::ActiveModel {
        uuid: Set(uuid),
        project_uuid: Set(project_uuid),
        key: Set(key.to_string()),
        is_main: Set(is_main),
        created_at: Set(now),
    };

    new_branch.insert(db).await
}

/// Fetch a component by key, regardless of its qualifier.
pub async fn select_by_key<C: ConnectionTrait>(
    db: &C,
    key: &str,
) -> Result<Option<component::Model>, DbErr> {
    component::Entity::find()
        .filter(component::Column::Key.eq(key))
        .one(db)
        .await
}

/// Fetch a component by key only if it has the expected qualifier.
pub async fn select_by_key_and_qualifier<C: ConnectionTrait>(
    db: &C,
    key: &str,
    qualifier: Qualifier,
) -> Result<Option<component::Model>, DbErr> {
    component::Entity::find()
        .filter(component::Column::Key.eq(key))
        .filter(component::Column::Qualifier.eq(qualifier))
        .one(db)
        .await
}

pub async fn select_by_uuids<C: ConnectionTrait>(
    db: &C,
    uuids: &HashSet<Uuid>,
) -> Result<Vec<component::Model>, DbErr> {
    if uuids.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = uuids.iter().copied().collect();
    let mut found = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_BATCH_SIZE) {
        let rows = component::Entity::find()
            .filter(component::Column::Uuid.is_in(chunk.iter().copied()))
            .all(db)
            .await?;
        found.extend(rows);
    }

    Ok(found)
}

/// Fetch a branch of `project_uuid` by its key.
pub async fn select_branch_by_key<C: ConnectionTrait>(
    db: &C,
    project_uuid: Uuid,
    key: &str,
) -> Result<Option<project_branch::Model>, DbErr> {
    project_branch::Entity::find()
        .filter(project_branch::Column::ProjectUuid.eq(project_uuid))
        .filter(project_branch::Column::Key.eq(key))
        .one(db)
        .await
}

/// The main branch of `project_uuid`.
pub async fn select_main_branch<C: ConnectionTrait>(
    db: &C,
    project_uuid: Uuid,
) -> Result<Option<project_branch::Model>, DbErr> {
    project_branch::Entity::find()
        .filter(project_branch::Column::ProjectUuid.eq(project_uuid))
        .filter(project_branch::Column::IsMain.eq(true))
        .one(db)
        .await
}

/// Main branch uuid of each of the given projects, as a project_uuid -> branch_uuid map.
pub async fn select_main_branches<C: ConnectionTrait>(
    db: &C,
    project_uuids: &HashSet<Uuid>,
) -> Result<HashMap<Uuid, Uuid>, DbErr> {
    if project_uuids.is_empty() {
        return Ok(HashMap::new());
    }

    let ids: Vec<Uuid> = project_uuids.iter().copied().collect();
    let mut mains = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_BATCH_SIZE) {
        let rows = project_branch::Entity::find()
            .filter(project_branch::Column::ProjectUuid.is_in(chunk.iter().copied()))
            .filter(project_branch::Column::IsMain.eq(true))
            .all(db)
            .await?;
        for branch in rows {
            mains.insert(branch.project_uuid, branch.uuid);
        }
    }

    Ok(mains)
}
