//! Per-line delay state and the accumulation rules applied on every sample.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::QueryError;
use crate::lines::{LineCatalog, LineId};

/// Tracker handle shared by the scheduler (writer) and query service (readers).
pub type SharedTracker = Arc<RwLock<TrackerState>>;

/// Lines that changed state in one update.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transitions {
    pub newly_delayed: Vec<LineId>,
    pub recovered: Vec<LineId>,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.newly_delayed.is_empty() && self.recovered.is_empty()
    }
}

/// Point-in-time view of a single line.
#[derive(Debug, Clone, Serialize)]
pub struct LineReport {
    pub line: LineId,
    pub delayed: bool,
    pub delay_secs: u64,
    pub uptime: Option<f64>,
}

/// Consistent view of every tracked line, taken under one lock acquisition.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSnapshot {
    pub start_time: Option<DateTime<Utc>>,
    pub taken_at: DateTime<Utc>,
    pub lines: Vec<LineReport>,
}

/// Delay bookkeeping since process start.
///
/// `cumulative_delay_secs` has an entry for every catalog line from the
/// moment the tracker is built, and `currently_delayed` is always a subset
/// of its keys.
#[derive(Debug, Clone)]
pub struct TrackerState {
    currently_delayed: BTreeSet<LineId>,
    cumulative_delay_secs: BTreeMap<LineId, u64>,
    start_time: Option<DateTime<Utc>>,
}

impl TrackerState {
    pub fn new(catalog: &LineCatalog) -> Self {
        Self {
            currently_delayed: BTreeSet::new(),
            cumulative_delay_secs: catalog.iter().map(|line| (line.clone(), 0)).collect(),
            start_time: None,
        }
    }

    pub fn shared(catalog: &LineCatalog) -> SharedTracker {
        Arc::new(RwLock::new(Self::new(catalog)))
    }

    /// Records the monitoring start time. Later calls leave it untouched.
    pub fn mark_started(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        *self.start_time.get_or_insert(at)
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Applies a fresh sample.
    ///
    /// `elapsed_secs` is charged to every line that was delayed going into
    /// the interval, including lines that recover in this sample. Lines that
    /// only appear in `sample` are not charged until the next update.
    pub fn update(&mut self, mut sample: BTreeSet<LineId>, elapsed_secs: u64) -> Transitions {
        sample.retain(|line| {
            let known = self.cumulative_delay_secs.contains_key(line);
            if !known {
                warn!(line = %line, "Dropping untracked line from sample");
            }
            known
        });

        let newly_delayed: Vec<LineId> = sample.difference(&self.currently_delayed).cloned().collect();
        for line in &newly_delayed {
            warn!(line = %line, "Line is experiencing delays");
        }

        let recovered: Vec<LineId> = self.currently_delayed.difference(&sample).cloned().collect();
        for line in &recovered {
            info!(line = %line, "Line is now recovered");
        }

        for line in &self.currently_delayed {
            if let Some(total) = self.cumulative_delay_secs.get_mut(line) {
                *total = total.saturating_add(elapsed_secs);
            }
        }
        self.currently_delayed = sample;

        Transitions {
            newly_delayed,
            recovered,
        }
    }

    pub fn is_delayed(&self, line: &LineId) -> bool {
        self.currently_delayed.contains(line)
    }

    pub fn currently_delayed(&self) -> &BTreeSet<LineId> {
        &self.currently_delayed
    }

    pub fn cumulative_delay_secs(&self, line: &LineId) -> u64 {
        self.cumulative_delay_secs.get(line).copied().unwrap_or(0)
    }

    /// `1 - delay / (now - start)`, clamped to `[0, 1]`.
    ///
    /// # Errors
    ///
    /// [`QueryError::UndefinedUptime`] before [`mark_started`](Self::mark_started)
    /// or when `now` is not after the start time.
    pub fn uptime_at(&self, line: &LineId, now: DateTime<Utc>) -> Result<f64, QueryError> {
        let start = self.start_time.ok_or(QueryError::UndefinedUptime)?;
        let total_secs = (now - start).num_milliseconds() as f64 / 1000.0;
        if total_secs <= 0.0 {
            return Err(QueryError::UndefinedUptime);
        }
        let delayed_secs = self.cumulative_delay_secs(line) as f64;
        Ok((1.0 - delayed_secs / total_secs).clamp(0.0, 1.0))
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> TrackerSnapshot {
        let lines = self
            .cumulative_delay_secs
            .iter()
            .map(|(line, delay_secs)| LineReport {
                line: line.clone(),
                delayed: self.is_delayed(line),
                delay_secs: *delay_secs,
                uptime: self.uptime_at(line, now).ok(),
            })
            .collect();

        TrackerSnapshot {
            start_time: self.start_time,
            taken_at: now,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn catalog() -> LineCatalog {
        LineCatalog::default()
    }

    fn lines(catalog: &LineCatalog, codes: &[&str]) -> BTreeSet<LineId> {
        codes.iter().map(|c| catalog.resolve(c).unwrap()).collect()
    }

    fn line(catalog: &LineCatalog, code: &str) -> LineId {
        catalog.resolve(code).unwrap()
    }

    #[test]
    fn test_new_state_is_zeroed() {
        let catalog = catalog();
        let state = TrackerState::new(&catalog);
        assert!(state.currently_delayed().is_empty());
        assert!(state.start_time().is_none());
        for l in catalog.iter() {
            assert_eq!(state.cumulative_delay_secs(l), 0);
        }
    }

    #[test]
    fn test_transitions_and_charging() {
        let catalog = catalog();
        let mut state = TrackerState::new(&catalog);
        state.update(lines(&catalog, &["A", "B"]), 30);

        let transitions = state.update(lines(&catalog, &["B", "C"]), 30);
        assert_eq!(transitions.recovered, vec![line(&catalog, "A")]);
        assert_eq!(transitions.newly_delayed, vec![line(&catalog, "C")]);

        assert_eq!(state.cumulative_delay_secs(&line(&catalog, "A")), 30);
        assert_eq!(state.cumulative_delay_secs(&line(&catalog, "B")), 30);
        assert_eq!(state.cumulative_delay_secs(&line(&catalog, "C")), 0);
        assert_eq!(state.currently_delayed(), &lines(&catalog, &["B", "C"]));
    }

    #[test]
    fn test_first_sample_charges_nothing() {
        let catalog = catalog();
        let mut state = TrackerState::new(&catalog);
        let transitions = state.update(lines(&catalog, &["1", "2"]), 30);
        assert_eq!(transitions.newly_delayed.len(), 2);
        assert!(transitions.recovered.is_empty());
        assert_eq!(state.cumulative_delay_secs(&line(&catalog, "1")), 0);
    }

    #[test]
    fn test_unchanged_sample_has_no_transitions() {
        let catalog = catalog();
        let mut state = TrackerState::new(&catalog);
        state.update(lines(&catalog, &["L"]), 30);
        let transitions = state.update(lines(&catalog, &["L"]), 30);
        assert!(transitions.is_empty());
        assert_eq!(state.cumulative_delay_secs(&line(&catalog, "L")), 30);
    }

    #[test]
    fn test_never_sampled_lines_stay_at_zero() {
        let catalog = catalog();
        let mut state = TrackerState::new(&catalog);
        let samples: [&[&str]; 5] = [&["1"], &["1", "A"], &[], &["A"], &["1"]];
        for sample in samples {
            state.update(lines(&catalog, sample), 30);
        }
        for l in catalog.iter().filter(|l| !["1", "A"].contains(&l.as_str())) {
            assert_eq!(state.cumulative_delay_secs(l), 0, "{l} should be untouched");
        }
    }

    #[test]
    fn test_cumulative_is_monotonic() {
        let catalog = catalog();
        let mut state = TrackerState::new(&catalog);
        let samples: [&[&str]; 7] = [&["Q"], &[], &["Q", "R"], &["R"], &[], &["Q"], &["Q"]];
        let mut previous: Vec<u64> = catalog.iter().map(|l| state.cumulative_delay_secs(l)).collect();
        for sample in samples {
            state.update(lines(&catalog, sample), 30);
            let current: Vec<u64> = catalog.iter().map(|l| state.cumulative_delay_secs(l)).collect();
            for (before, after) in previous.iter().zip(&current) {
                assert!(after >= before);
            }
            previous = current;
        }
    }

    #[test]
    fn test_untracked_lines_are_dropped() {
        let full = catalog();
        let narrow = LineCatalog::new(["1"], std::iter::empty::<(&str, &str)>()).unwrap();
        let mut state = TrackerState::new(&narrow);
        let transitions = state.update(lines(&full, &["1", "A"]), 30);
        assert_eq!(transitions.newly_delayed, vec![line(&narrow, "1")]);
        assert!(!state.is_delayed(&line(&full, "A")));
    }

    #[test]
    fn test_mark_started_is_immutable() {
        let catalog = catalog();
        let mut state = TrackerState::new(&catalog);
        let first = Utc::now();
        assert_eq!(state.mark_started(first), first);
        assert_eq!(state.mark_started(first + Duration::seconds(10)), first);
        assert_eq!(state.start_time(), Some(first));
    }

    #[test]
    fn test_uptime_undefined_before_start_and_at_start() {
        let catalog = catalog();
        let mut state = TrackerState::new(&catalog);
        let l = line(&catalog, "1");
        let now = Utc::now();
        assert_eq!(state.uptime_at(&l, now), Err(QueryError::UndefinedUptime));
        state.mark_started(now);
        assert_eq!(state.uptime_at(&l, now), Err(QueryError::UndefinedUptime));
    }

    #[test]
    fn test_uptime_formula() {
        let catalog = catalog();
        let mut state = TrackerState::new(&catalog);
        let start = Utc::now();
        state.mark_started(start);
        state.update(lines(&catalog, &[]), 30);
        state.update(lines(&catalog, &["1"]), 30);
        state.update(lines(&catalog, &[]), 30);

        let uptime = state.uptime_at(&line(&catalog, "1"), start + Duration::seconds(90)).unwrap();
        assert!((uptime - (1.0 - 30.0 / 90.0)).abs() < 1e-9);
        let other = state.uptime_at(&line(&catalog, "A"), start + Duration::seconds(90)).unwrap();
        assert_eq!(other, 1.0);
    }

    #[test]
    fn test_snapshot_reports_every_line() {
        let catalog = catalog();
        let mut state = TrackerState::new(&catalog);
        let start = Utc::now();
        state.mark_started(start);
        state.update(lines(&catalog, &["Z"]), 30);
        state.update(lines(&catalog, &["Z"]), 30);

        let snapshot = state.snapshot_at(start + Duration::seconds(60));
        assert_eq!(snapshot.lines.len(), catalog.len());
        let z = snapshot.lines.iter().find(|r| r.line.as_str() == "Z").unwrap();
        assert!(z.delayed);
        assert_eq!(z.delay_secs, 30);
        assert_eq!(z.uptime, Some(0.5));
    }
}
