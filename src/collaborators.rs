//! Dependencies the engine calls out to but does not own.
//!
//! They are handed to [`crate::service::PortfolioService`] explicitly so tests
//! can substitute recording fakes.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::portfolio;

/// Normalized view of a portfolio handed to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentValue {
    pub uuid: Uuid,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    /// `VIEW` for roots, `SUBVIEW` otherwise.
    pub qualifier: &'static str,
}

impl From<&portfolio::Model> for ComponentValue {
    fn from(p: &portfolio::Model) -> Self {
        Self {
            uuid: p.uuid,
            key: p.key.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            is_private: p.is_private,
            qualifier: p.qualifier(),
        }
    }
}

pub trait AuditPersister: Send + Sync {
    fn record_create(&self, component: &ComponentValue);
    fn record_update(&self, component: &ComponentValue);
    fn record_delete(&self, component: &ComponentValue);
}

pub trait UuidFactory: Send + Sync {
    fn new_uuid(&self) -> Uuid;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Fire-and-forget notification that the aggregates of these roots are
/// stale.
pub trait RefreshSignal: Send + Sync {
    fn roots_changed(&self, root_uuids: &BTreeSet<Uuid>);
}

/// Emits one JSON line per audited change on the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditPersister;

impl TracingAuditPersister {
    fn emit(&self, action: &str, component: &ComponentValue) {
        match serde_json::to_string(component) {
            Ok(json) => tracing::info!(target: "audit", action, component = %json),
            Err(e) => {
                tracing::error!(target: "audit", action, "Failed to serialize audit record: {e}")
            }
        }
    }
}

impl AuditPersister for TracingAuditPersister {
    fn record_create(&self, component: &ComponentValue) {
        self.emit("create", component);
    }

    fn record_update(&self, component: &ComponentValue) {
        self.emit("update", component);
    }

    fn record_delete(&self, component: &ComponentValue) {
        self.emit("delete", component);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUuidFactory;

impl UuidFactory for RandomUuidFactory {
    fn new_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Logs stale roots on the `refresh` target; the actual recomputation is
/// done by whoever consumes these logs or replaces this implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRefreshSignal;

impl RefreshSignal for TracingRefreshSignal {
    fn roots_changed(&self, root_uuids: &BTreeSet<Uuid>) {
        if root_uuids.is_empty() {
            return;
        }
        let roots: Vec<String> = root_uuids.iter().map(Uuid::to_string).collect();
        tracing::info!(target: "refresh", roots = ?roots, "Portfolio aggregates are stale");
    }
}

/// Bundle of collaborators injected into the service.
#[derive(Clone)]
pub struct Collaborators {
    pub audit: Arc<dyn AuditPersister>,
    pub uuids: Arc<dyn UuidFactory>,
    pub clock: Arc<dyn Clock>,
    pub refresh: Arc<dyn RefreshSignal>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            audit: Arc::new(TracingAuditPersister),
            uuids: Arc::new(RandomUuidFactory),
            clock: Arc::new(SystemClock),
            refresh: Arc::new(TracingRefreshSignal),
        }
    }
}
