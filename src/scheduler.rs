//! Periodic fetch → update driver.
//!
//! One [`Scheduler`] owns the only ticker in the process. Cycles are
//! serialized by `cycle`, and only the in-memory update runs under the
//! tracker lock; the fetch happens before the lock is taken.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::{CycleError, FetchError};
use crate::services::delay_feed::DelayFeed;
use crate::tracker::{SharedTracker, Transitions};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

pub struct Scheduler<F> {
    feed: F,
    tracker: SharedTracker,
    interval: Duration,
    fetch_timeout: Duration,
    cycle: Mutex<()>,
}

impl<F: DelayFeed + 'static> Scheduler<F> {
    pub fn new(feed: F, tracker: SharedTracker, interval: Duration, fetch_timeout: Duration) -> Self {
        Self {
            feed,
            tracker,
            interval,
            fetch_timeout,
            cycle: Mutex::new(()),
        }
    }

    /// Fetches one sample and applies it, charging the nominal interval.
    ///
    /// On error the tracker is left untouched.
    #[tracing::instrument(name = "cycle", skip(self))]
    pub async fn run_cycle(&self) -> Result<Transitions, CycleError> {
        let _cycle = self.cycle.lock().await;

        let sample = tokio::time::timeout(self.fetch_timeout, self.feed.fetch_delayed_lines())
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;

        let mut state = self.tracker.write().await;
        Ok(state.update(sample, self.interval.as_secs()))
    }

    async fn tick(&self) {
        match self.run_cycle().await {
            Ok(transitions) => debug!(
                newly_delayed = transitions.newly_delayed.len(),
                recovered = transitions.recovered.len(),
                "Cycle applied"
            ),
            Err(e) => error!(error = %e, "Feed cycle failed, skipping update"),
        }
    }

    /// Stamps the start time, runs the first cycle before returning, then
    /// hands the ticker to a background task.
    pub async fn start(self: Arc<Self>) -> JoinHandle<()> {
        let started = self.tracker.write().await.mark_started(Utc::now());
        info!(
            start_time = %started,
            interval_secs = self.interval.as_secs(),
            "Starting delay monitor"
        );

        self.tick().await;

        tokio::spawn(async move { self.run_forever().await })
    }

    async fn run_forever(&self) {
        let Some(first_tick) = Instant::now().checked_add(self.interval) else {
            error!(
                interval_secs = self.interval.as_secs(),
                "Polling interval is out of range, background monitoring stopped"
            );
            return;
        };
        let mut ticker = tokio::time::interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }
}
