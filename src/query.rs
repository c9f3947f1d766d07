//! Read-only access to tracker state for HTTP callers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::QueryError;
use crate::lines::{LineCatalog, LineId};
use crate::tracker::{SharedTracker, TrackerSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Delayed,
    NotDelayed,
}

impl LineStatus {
    pub fn is_delayed(self) -> bool {
        self == LineStatus::Delayed
    }
}

/// Validates line identifiers and answers status/uptime questions.
///
/// Never takes the tracker's write lock, so queries cannot disturb state.
#[derive(Clone)]
pub struct QueryService {
    tracker: SharedTracker,
    catalog: Arc<LineCatalog>,
}

impl QueryService {
    pub fn new(tracker: SharedTracker, catalog: Arc<LineCatalog>) -> Self {
        Self { tracker, catalog }
    }

    pub fn resolve(&self, raw: &str) -> Result<LineId, QueryError> {
        Ok(self.catalog.resolve(raw)?)
    }

    pub async fn status(&self, raw: &str) -> Result<LineStatus, QueryError> {
        let line = self.resolve(raw)?;
        let state = self.tracker.read().await;
        Ok(if state.is_delayed(&line) {
            LineStatus::Delayed
        } else {
            LineStatus::NotDelayed
        })
    }

    pub async fn uptime(&self, raw: &str) -> Result<f64, QueryError> {
        self.uptime_at(raw, Utc::now()).await
    }

    pub async fn uptime_at(&self, raw: &str, now: DateTime<Utc>) -> Result<f64, QueryError> {
        let line = self.resolve(raw)?;
        self.tracker.read().await.uptime_at(&line, now)
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        self.tracker.read().await.snapshot_at(Utc::now())
    }
}
