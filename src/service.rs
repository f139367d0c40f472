//! Public entry point of the engine.
//!
//! Each mutating call runs in its own transaction: validation happens first,
//! writes follow, and an error anywhere drops the transaction uncommitted.
//! Audit records and refresh signals are emitted only after a commit.

use std::collections::BTreeSet;

use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use crate::collaborators::{Collaborators, ComponentValue};
use crate::db::{
    components, portfolio as portfolio_db, projects as projects_db, references as references_db,
};
use crate::error::{PortfolioError, Result};
use crate::membership;
use crate::models::component::Qualifier;
use crate::models::portfolio::{self, CreatePortfolio, ModeCounts, SelectionMode, UpdatePortfolio};
use crate::models::portfolio_project::PortfolioProjectDto;
use crate::models::portfolio_reference::ReferenceDto;
use crate::reference_graph;
use crate::selection::{self, SelectionOutcome, SelectionRequest};
use crate::tree::PortfolioTree;

pub struct PortfolioService {
    db: DatabaseConnection,
    collaborators: Collaborators,
}

impl PortfolioService {
    pub fn new(db: DatabaseConnection, collaborators: Collaborators) -> Self {
        Self { db, collaborators }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // ── Portfolios ──

    /// Create a new tree made of a single root portfolio.
    pub async fn create_root(&self, input: CreatePortfolio) -> Result<portfolio::Model> {
        let txn = self.db.begin().await?;
        ensure_key_available(&txn, &input).await?;

        let uuid = self.collaborators.uuids.new_uuid();
        let model = self.new_model(uuid, uuid, None, input);
        let created = portfolio_db::insert_portfolio(&txn, model).await?;
        txn.commit().await?;

        tracing::info!(portfolio = %created.key, uuid = %created.uuid, "Created root portfolio");
        self.collaborators.audit.record_create(&ComponentValue::from(&created));
        Ok(created)
    }

    /// Create a subportfolio under `parent_key`; it inherits the parent's root.
    pub async fn create_child(
        &self,
        parent_key: &str,
        input: CreatePortfolio,
    ) -> Result<portfolio::Model> {
        let txn = self.db.begin().await?;
        let parent = resolve_portfolio(&txn, parent_key).await?;
        ensure_key_available(&txn, &input).await?;

        let uuid = self.collaborators.uuids.new_uuid();
        let model = self.new_model(uuid, parent.root_uuid, Some(parent.uuid), input);
        let created = portfolio_db::insert_portfolio(&txn, model).await?;
        txn.commit().await?;

        tracing::info!(
            portfolio = %created.key,
            parent = %parent.key,
            "Created subportfolio"
        );
        self.collaborators.audit.record_create(&ComponentValue::from(&created));
        self.signal_refresh([created.root_uuid]);
        Ok(created)
    }

    /// Change display metadata and visibility.
    pub async fn update_details(
        &self,
        key: &str,
        input: UpdatePortfolio,
    ) -> Result<portfolio::Model> {
        if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(PortfolioError::invalid_argument("portfolio name cannot be blank"));
        }

        let txn = self.db.begin().await?;
        let mut p = resolve_portfolio(&txn, key).await?;

        if let Some(name) = input.name {
            p.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            p.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(is_private) = input.is_private {
            p.is_private = is_private;
        }
        p.updated_at = self.collaborators.clock.now();

        let updated = portfolio_db::update_portfolio(&txn, p).await?;
        txn.commit().await?;

        tracing::info!(portfolio = %updated.key, "Updated portfolio details");
        self.collaborators.audit.record_update(&ComponentValue::from(&updated));
        Ok(updated)
    }

    pub async fn get_by_key(&self, key: &str) -> Result<portfolio::Model> {
        resolve_portfolio(&self.db, key).await
    }

    pub async fn get_by_uuid(&self, uuid: Uuid) -> Result<portfolio::Model> {
        portfolio_db::select_by_uuid(&self.db, uuid)
            .await?
            .ok_or_else(|| PortfolioError::not_found("portfolio", uuid.to_string()))
    }

    pub async fn roots(&self) -> Result<Vec<portfolio::Model>> {
        Ok(portfolio_db::select_all_roots(&self.db).await?)
    }

    /// The whole tree containing the portfolio with `key`.
    pub async fn tree(&self, key: &str) -> Result<PortfolioTree> {
        let p = resolve_portfolio(&self.db, key).await?;
        PortfolioTree::load(&self.db, p.root_uuid).await
    }

    /// Delete the portfolio with `key` and its whole subtree, along with the
    /// references pointing into it and the manual selections inside it.
    /// Returns the deleted uuids in level order.
    pub async fn delete(&self, key: &str) -> Result<Vec<Uuid>> {
        let txn = self.db.begin().await?;
        let target = resolve_portfolio(&txn, key).await?;
        let tree = PortfolioTree::load(&txn, target.root_uuid).await?;

        let closure: Vec<portfolio::Model> =
            tree.subtree(target.uuid)?.into_iter().cloned().collect();
        let uuids: Vec<Uuid> = closure.iter().map(|p| p.uuid).collect();

        let mut stale: BTreeSet<Uuid> =
            references_db::select_root_uuids_of_referencers_to_any(&txn, &uuids)
                .await?
                .into_iter()
                .collect();
        if !target.is_root() {
            stale.insert(target.root_uuid);
        }
        stale.retain(|root| !uuids.contains(root));

        let deleted = portfolio_db::delete_closure(&txn, &uuids).await?;
        if deleted != uuids.len() as u64 {
            return Err(PortfolioError::integrity(format!(
                "expected to delete {} portfolios under '{}', deleted {deleted}",
                uuids.len(),
                target.key
            )));
        }
        txn.commit().await?;

        tracing::info!(portfolio = %target.key, deleted, "Deleted portfolio subtree");
        for p in &closure {
            self.collaborators.audit.record_delete(&ComponentValue::from(p));
        }
        self.signal_refresh(stale);
        Ok(uuids)
    }

    pub async fn count_by_mode(&self) -> Result<ModeCounts> {
        Ok(ModeCounts {
            portfolios: portfolio_db::count_portfolios_by_mode(&self.db).await?,
            subportfolios: portfolio_db::count_subportfolios_by_mode(&self.db).await?,
        })
    }

    // ── Selection mode ──

    /// Switch the selection mode of the portfolio with `key`.
    ///
    /// The mode string is parsed before any read or write. Switching to
    /// `REST` resets any other `REST` node of the tree to `NONE`; switching
    /// to anything but `MANUAL` drops the manual selections.
    pub async fn update_selection_mode(
        &self,
        key: &str,
        mode: &str,
        expression: Option<&str>,
    ) -> Result<SelectionOutcome> {
        let request = SelectionRequest::parse(mode, expression)
            .inspect_err(|e| tracing::warn!(portfolio = %key, "Rejected selection mode: {e}"))?;

        let txn = self.db.begin().await?;
        let target = resolve_portfolio(&txn, key).await?;
        let tree = PortfolioTree::load(&txn, target.root_uuid).await?;
        let outcome = selection::update_selection_mode(
            &txn,
            &tree,
            target.uuid,
            request,
            self.collaborators.clock.now(),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(
            portfolio = %outcome.portfolio.key,
            mode = %outcome.portfolio.selection_mode,
            reset = outcome.reset.len(),
            cleared_projects = outcome.cleared_projects,
            "Updated selection mode"
        );
        for p in outcome.reset.iter().chain(std::iter::once(&outcome.portfolio)) {
            self.collaborators.audit.record_update(&ComponentValue::from(p));
        }
        self.signal_refresh([outcome.portfolio.root_uuid]);
        Ok(outcome)
    }

    // ── Manual selection ──

    /// Manually select the project with `project_key` in `portfolio_key`.
    pub async fn append_project(
        &self,
        portfolio_key: &str,
        project_key: &str,
    ) -> Result<PortfolioProjectDto> {
        let txn = self.db.begin().await?;
        let p = resolve_portfolio(&txn, portfolio_key).await?;
        let project = membership::resolve_project(&txn, project_key).await?;

        let selection = membership::append_project(
            &txn,
            self.collaborators.uuids.as_ref(),
            self.collaborators.clock.as_ref(),
            &p,
            &project,
        )
        .await
        .inspect_err(|e| {
            tracing::warn!(
                portfolio = %portfolio_key,
                project = %project_key,
                "Rejected project selection: {e}"
            )
        })?;
        txn.commit().await?;

        tracing::info!(portfolio = %p.key, project = %project.key, "Selected project");
        self.signal_refresh([p.root_uuid]);
        Ok(selection)
    }

    /// Remove a manual selection. Returns `false` when there was none.
    pub async fn remove_project(&self, portfolio_key: &str, project_key: &str) -> Result<bool> {
        let txn = self.db.begin().await?;
        let p = resolve_portfolio(&txn, portfolio_key).await?;
        let project = membership::resolve_project(&txn, project_key).await?;

        let removed = membership::remove_project(&txn, &p, &project).await?;
        txn.commit().await?;

        if removed {
            tracing::info!(portfolio = %p.key, project = %project.key, "Unselected project");
            self.signal_refresh([p.root_uuid]);
        }
        Ok(removed)
    }

    /// Restrict an existing manual selection to `branch_key` (cumulative).
    pub async fn add_project_branch(
        &self,
        portfolio_key: &str,
        project_key: &str,
        branch_key: &str,
    ) -> Result<PortfolioProjectDto> {
        let txn = self.db.begin().await?;
        let p = resolve_portfolio(&txn, portfolio_key).await?;
        let project = membership::resolve_project(&txn, project_key).await?;
        let branch = components::select_branch_by_key(&txn, project.uuid, branch_key)
            .await?
            .ok_or_else(|| {
                PortfolioError::not_found("branch", format!("{project_key}/{branch_key}"))
            })?;

        let selection = membership::add_project_branch(
            &txn,
            self.collaborators.uuids.as_ref(),
            self.collaborators.clock.as_ref(),
            &p,
            &project,
            &branch,
        )
        .await?;
        txn.commit().await?;

        tracing::info!(
            portfolio = %p.key,
            project = %project.key,
            branch = %branch.key,
            "Selected project branch"
        );
        self.signal_refresh([p.root_uuid]);
        Ok(selection)
    }

    /// Drop a branch from a manual selection. Returns `false` when it was not
    /// selected.
    pub async fn remove_project_branch(
        &self,
        portfolio_key: &str,
        project_key: &str,
        branch_key: &str,
    ) -> Result<bool> {
        let txn = self.db.begin().await?;
        let p = resolve_portfolio(&txn, portfolio_key).await?;
        let project = membership::resolve_project(&txn, project_key).await?;
        let Some(branch) =
            components::select_branch_by_key(&txn, project.uuid, branch_key).await?
        else {
            return Ok(false);
        };

        let removed =
            projects_db::delete_branch(&txn, p.uuid, project.uuid, branch.uuid).await? > 0;
        txn.commit().await?;

        if removed {
            self.signal_refresh([p.root_uuid]);
        }
        Ok(removed)
    }

    /// Manual selections of the whole tree containing `key`.
    pub async fn projects_in_hierarchy(&self, key: &str) -> Result<Vec<PortfolioProjectDto>> {
        let p = resolve_portfolio(&self.db, key).await?;
        Ok(projects_db::select_all_projects_in_hierarchy(&self.db, p.root_uuid).await?)
    }

    pub async fn portfolio_projects(&self, key: &str) -> Result<Vec<PortfolioProjectDto>> {
        let p = resolve_portfolio(&self.db, key).await?;
        Ok(projects_db::select_portfolio_projects(&self.db, p.uuid).await?)
    }

    // ── References ──

    /// Make `source_key` include the tree of `target_key` by reference.
    pub async fn add_reference_to_portfolio(
        &self,
        source_key: &str,
        target_key: &str,
    ) -> Result<ReferenceDto> {
        let txn = self.db.begin().await?;
        let source = resolve_portfolio(&txn, source_key).await?;
        let target = resolve_portfolio(&txn, target_key).await?;

        reference_graph::add_reference_to_portfolio(
            &txn,
            self.collaborators.uuids.as_ref(),
            self.collaborators.clock.as_ref(),
            &source,
            &target,
        )
        .await
        .inspect_err(|e| {
            tracing::warn!(
                source = %source_key,
                target = %target_key,
                "Rejected portfolio reference: {e}"
            )
        })?;

        let reference = references_db::select_reference_to_portfolio(&txn, source.uuid, &target.key)
            .await?
            .ok_or_else(|| PortfolioError::integrity("reference vanished right after insert"))?;
        txn.commit().await?;

        tracing::info!(source = %source.key, target = %target.key, "Added portfolio reference");
        self.signal_refresh([source.root_uuid]);
        Ok(reference)
    }

    /// Make `source_key` include the application `app_key` on `branch_key`,
    /// or on its main branch when no branch is given. Adding an existing
    /// edge is a no-op.
    pub async fn add_reference_to_application(
        &self,
        source_key: &str,
        app_key: &str,
        branch_key: Option<&str>,
    ) -> Result<ReferenceDto> {
        let txn = self.db.begin().await?;
        let source = resolve_portfolio(&txn, source_key).await?;
        let app = components::select_by_key_and_qualifier(&txn, app_key, Qualifier::Application)
            .await?
            .ok_or_else(|| PortfolioError::not_found("application", app_key))?;
        let branch = match branch_key {
            Some(branch_key) => components::select_branch_by_key(&txn, app.uuid, branch_key)
                .await?
                .ok_or_else(|| {
                    PortfolioError::not_found("branch", format!("{app_key}/{branch_key}"))
                })?,
            None => components::select_main_branch(&txn, app.uuid)
                .await?
                .ok_or_else(|| {
                    PortfolioError::integrity(format!("application '{app_key}' has no main branch"))
                })?,
        };

        let exists =
            references_db::reference_exists(&txn, source.uuid, app.uuid, Some(branch.uuid))
                .await?;
        if !exists {
            references_db::insert_reference(
                &txn,
                self.collaborators.uuids.new_uuid(),
                source.uuid,
                app.uuid,
                Some(branch.uuid),
                self.collaborators.clock.now(),
            )
            .await?;
        }

        let reference = references_db::select_reference_to_app(&txn, source.uuid, &app.key)
            .await?
            .ok_or_else(|| PortfolioError::integrity("reference vanished right after insert"))?;
        txn.commit().await?;

        if !exists {
            tracing::info!(
                source = %source.key,
                application = %app.key,
                "Added application reference"
            );
            self.signal_refresh([source.root_uuid]);
        }
        Ok(reference)
    }

    /// Remove every edge from `source_key` to `target_key` (portfolio or
    /// application). Returns `false` when there was none.
    pub async fn remove_reference(&self, source_key: &str, target_key: &str) -> Result<bool> {
        let txn = self.db.begin().await?;
        let source = resolve_portfolio(&txn, source_key).await?;
        let target_uuid = resolve_reference_target(&txn, target_key).await?;

        let removed = references_db::delete_reference(&txn, source.uuid, target_uuid).await? > 0;
        txn.commit().await?;

        if removed {
            tracing::info!(source = %source.key, target = %target_key, "Removed reference");
            self.signal_refresh([source.root_uuid]);
        }
        Ok(removed)
    }

    /// Remove one branch of an application reference.
    pub async fn remove_reference_branch(
        &self,
        source_key: &str,
        app_key: &str,
        branch_key: &str,
    ) -> Result<bool> {
        let txn = self.db.begin().await?;
        let source = resolve_portfolio(&txn, source_key).await?;
        let app = components::select_by_key_and_qualifier(&txn, app_key, Qualifier::Application)
            .await?
            .ok_or_else(|| PortfolioError::not_found("application", app_key))?;
        let Some(branch) = components::select_branch_by_key(&txn, app.uuid, branch_key).await?
        else {
            return Ok(false);
        };

        let removed =
            references_db::delete_reference_branch(&txn, source.uuid, app.uuid, branch.uuid)
                .await?
                > 0;
        txn.commit().await?;

        if removed {
            self.signal_refresh([source.root_uuid]);
        }
        Ok(removed)
    }

    /// References held by any node of the tree containing `key`.
    pub async fn references_in_hierarchy(&self, key: &str) -> Result<Vec<ReferenceDto>> {
        let p = resolve_portfolio(&self.db, key).await?;
        Ok(references_db::select_references_in_hierarchy(&self.db, p.root_uuid).await?)
    }

    /// Portfolios referencing the portfolio or application with `key`.
    pub async fn get_referencers_by_key(&self, key: &str) -> Result<Vec<portfolio::Model>> {
        let target_uuid = resolve_reference_target(&self.db, key).await?;
        Ok(references_db::select_referencers(&self.db, target_uuid).await?)
    }

    /// Remove every reference pointing at the portfolio or application with
    /// `key`, typically right before that entity is deleted.
    pub async fn delete_referencers_to(&self, key: &str) -> Result<u64> {
        let txn = self.db.begin().await?;
        let target_uuid = resolve_reference_target(&txn, key).await?;
        let stale: BTreeSet<Uuid> = references_db::select_root_of_referencers(&txn, target_uuid)
            .await?
            .into_iter()
            .map(|p| p.uuid)
            .collect();

        let removed = references_db::delete_references_to(&txn, target_uuid).await?;
        txn.commit().await?;

        tracing::info!(target = %key, removed, "Removed references to entity");
        self.signal_refresh(stale);
        Ok(removed)
    }

    // ── Helpers ──

    fn new_model(
        &self,
        uuid: Uuid,
        root_uuid: Uuid,
        parent_uuid: Option<Uuid>,
        input: CreatePortfolio,
    ) -> portfolio::Model {
        let now = self.collaborators.clock.now();
        portfolio::Model {
            uuid,
            key: input.key.trim().to_string(),
            name: input.name.trim().to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            root_uuid,
            parent_uuid,
            selection_mode: SelectionMode::None,
            selection_expression: None,
            is_private: input.is_private,
            created_at: now,
            updated_at: now,
        }
    }

    fn signal_refresh(&self, roots: impl IntoIterator<Item = Uuid>) {
        let roots: BTreeSet<Uuid> = roots.into_iter().collect();
        if !roots.is_empty() {
            self.collaborators.refresh.roots_changed(&roots);
        }
    }
}

async fn resolve_portfolio<C: ConnectionTrait>(db: &C, key: &str) -> Result<portfolio::Model> {
    portfolio_db::select_by_key(db, key)
        .await?
        .ok_or_else(|| PortfolioError::not_found("portfolio", key))
}

/// Uuid of the portfolio or application carrying `key`.
async fn resolve_reference_target<C: ConnectionTrait>(db: &C, key: &str) -> Result<Uuid> {
    if let Some(p) = portfolio_db::select_by_key(db, key).await? {
        return Ok(p.uuid);
    }
    components::select_by_key_and_qualifier(db, key, Qualifier::Application)
        .await?
        .map(|app| app.uuid)
        .ok_or_else(|| PortfolioError::not_found("portfolio or application", key))
}

/// Keys are shared between portfolios and components, so a new portfolio
/// key must be unused by both.
async fn ensure_key_available<C: ConnectionTrait>(db: &C, input: &CreatePortfolio) -> Result<()> {
    let key = input.key.trim();
    if key.is_empty() {
        return Err(PortfolioError::invalid_argument("portfolio key cannot be blank"));
    }
    if input.name.trim().is_empty() {
        return Err(PortfolioError::invalid_argument("portfolio name cannot be blank"));
    }

    if portfolio_db::select_by_key(db, key).await?.is_some() {
        return Err(PortfolioError::invalid_argument(format!(
            "key '{key}' is already used by a portfolio"
        )));
    }
    if components::select_by_key(db, key).await?.is_some() {
        return Err(PortfolioError::invalid_argument(format!(
            "key '{key}' is already used by a component"
        )));
    }
    Ok(())
}
