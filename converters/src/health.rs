//! Health map: a mapping from subsystem name to healthy/unhealthy.
//!
//! Each key is written by exactly one owner (its supervisor); readers take
//! a snapshot. An `Arc<RwLock<HashMap<..>>>` so it's cheap to clone into
//! `web::Data` while staying a single source of truth.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

pub const WEBSERVER: &str = "webserver";
pub const JOB_QUEUE: &str = "jobQueue";
pub const BROWSER: &str = "browser";
pub const PANDOC: &str = "pandoc";

pub fn office_worker_key(port: u16) -> String {
    format!("unoservers.{port}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Unhealthy,
}

impl Health {
    pub fn is_healthy(self) -> bool {
        matches!(self, Health::Healthy)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HealthMap {
    inner: Arc<RwLock<HashMap<String, Health>>>,
}

impl HealthMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, health: Health) {
        self.inner.write().insert(key.into(), health);
    }

    pub fn snapshot(&self) -> HashMap<String, Health> {
        self.inner.read().clone()
    }

    /// Overall readiness: webserver, queue, browser and markup-converter
    /// (if configured) must all be healthy, and at least one office worker
    /// must be healthy.
    pub fn is_ready(&self, markup_configured: bool) -> bool {
        let snapshot = self.inner.read();

        let core_healthy = [WEBSERVER, JOB_QUEUE, BROWSER]
            .iter()
            .all(|key| snapshot.get(*key).is_some_and(|h| h.is_healthy()));

        if !core_healthy {
            return false;
        }

        if markup_configured && !snapshot.get(PANDOC).is_some_and(|h| h.is_healthy()) {
            return false;
        }

        snapshot
            .iter()
            .any(|(key, health)| key.starts_with("unoservers.") && health.is_healthy())
    }
}
