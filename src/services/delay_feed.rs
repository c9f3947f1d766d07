//! Trait for sources of per-cycle delay samples.

use std::collections::BTreeSet;

use crate::error::CycleError;
use crate::lines::LineId;

/// Abstraction over a status feed provider (e.g., the MTA SIRI endpoint).
#[async_trait::async_trait]
pub trait DelayFeed: Send + Sync {
    /// Returns the lines the feed currently reports as delayed.
    async fn fetch_delayed_lines(&self) -> Result<BTreeSet<LineId>, CycleError>;
}
