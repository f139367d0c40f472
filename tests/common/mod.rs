//! Shared harness: a fresh in-memory SQLite database per test plus
//! deterministic, recording collaborators.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use portfolio_engine::collaborators::{
    AuditPersister, Clock, Collaborators, ComponentValue, RefreshSignal, UuidFactory,
};
use portfolio_engine::db::components;
use portfolio_engine::models::component::{self, CreateComponent, Qualifier};
use portfolio_engine::models::project_branch;
use portfolio_engine::{Config, PortfolioService, create_pool};

/// Hands out `00000000-0000-0000-0000-000000000001`, `...002` and so on.
#[derive(Default)]
pub struct SequentialUuids(AtomicU64);

impl UuidFactory for SequentialUuids {
    fn new_uuid(&self) -> Uuid {
        Uuid::from_u128(self.0.fetch_add(1, Ordering::SeqCst) as u128 + 1)
    }
}

/// Advances one second on every read so creation order is total.
#[derive(Default)]
pub struct TickingClock(AtomicU64);

impl Clock for TickingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.0.fetch_add(1, Ordering::SeqCst) as i64;
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(tick)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    Create(String),
    Update(String),
    Delete(String),
}

#[derive(Default)]
pub struct RecordingAudit(Mutex<Vec<AuditEvent>>);

impl RecordingAudit {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

impl AuditPersister for RecordingAudit {
    fn record_create(&self, component: &ComponentValue) {
        self.0.lock().unwrap().push(AuditEvent::Create(component.key.clone()));
    }

    fn record_update(&self, component: &ComponentValue) {
        self.0.lock().unwrap().push(AuditEvent::Update(component.key.clone()));
    }

    fn record_delete(&self, component: &ComponentValue) {
        self.0.lock().unwrap().push(AuditEvent::Delete(component.key.clone()));
    }
}

#[derive(Default)]
pub struct RecordingRefresh(Mutex<Vec<BTreeSet<Uuid>>>);

impl RecordingRefresh {
    pub fn calls(&self) -> Vec<BTreeSet<Uuid>> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<BTreeSet<Uuid>> {
        self.0.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

impl RefreshSignal for RecordingRefresh {
    fn roots_changed(&self, root_uuids: &BTreeSet<Uuid>) {
        self.0.lock().unwrap().push(root_uuids.clone());
    }
}

pub struct TestContext {
    pub service: PortfolioService,
    pub audit: Arc<RecordingAudit>,
    pub refresh: Arc<RecordingRefresh>,
    pub uuids: Arc<SequentialUuids>,
    pub clock: Arc<TickingClock>,
}

impl TestContext {
    pub fn db(&self) -> &DatabaseConnection {
        self.service.connection()
    }

    /// Register a project (`TRK`) with its main branch.
    pub async fn project(&self, key: &str) -> component::Model {
        self.component(key, Qualifier::Project).await
    }

    /// Register an application (`APP`) with its main branch.
    pub async fn application(&self, key: &str) -> component::Model {
        self.component(key, Qualifier::Application).await
    }

    pub async fn branch(&self, component: &component::Model, key: &str) -> project_branch::Model {
        components::insert_branch(
            self.db(),
            self.uuids.new_uuid(),
            component.uuid,
            key,
            false,
            self.clock.now(),
        )
        .await
        .expect("Failed to insert branch")
    }

    async fn component(&self, key: &str, qualifier: Qualifier) -> component::Model {
        components::insert_component(
            self.db(),
            self.uuids.new_uuid(),
            self.uuids.new_uuid(),
            CreateComponent {
                key: key.to_string(),
                name: key.to_uppercase(),
                qualifier,
            },
            self.clock.now(),
        )
        .await
        .expect("Failed to insert component")
    }
}

pub async fn setup_db() -> DatabaseConnection {
    let db = create_pool(&Config::in_memory())
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

pub async fn setup() -> TestContext {
    let db = setup_db().await;

    let audit = Arc::new(RecordingAudit::default());
    let refresh = Arc::new(RecordingRefresh::default());
    let uuids = Arc::new(SequentialUuids::default());
    let clock = Arc::new(TickingClock::default());

    let collaborators = Collaborators {
        audit: audit.clone(),
        uuids: uuids.clone(),
        clock: clock.clone(),
        refresh: refresh.clone(),
    };

    TestContext {
        service: PortfolioService::new(db, collaborators),
        audit,
        refresh,
        uuids,
        clock,
    }
}
