//! Scheduling of analysis runs: debounced triggers and superseding runs.
//!
//! Neither type spawns threads or owns a clock. Callers pass `Instant`s in and
//! decide where the work runs.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tracing::debug;

/// Collapses bursts of triggers into a single run.
///
/// A run becomes due once `window` has passed since the *latest* trigger.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_trigger: Option<Instant>,
}

impl Debouncer {
    /// A debouncer with the given quiet window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last_trigger: None,
        }
    }

    /// A debouncer with a window in milliseconds.
    ///
    /// [`AnalysisConfig::debouncer`](crate::AnalysisConfig::debouncer) builds
    /// one from the configured window.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Records a trigger, pushing the deadline back.
    pub const fn trigger(&mut self, now: Instant) {
        self.last_trigger = Some(now);
    }

    /// Whether a trigger is waiting for its window to pass.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.last_trigger.is_some()
    }

    /// When the pending run becomes due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.last_trigger.map(|last| last + self.window)
    }

    /// Returns `true` exactly once per burst, when the window has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.last_trigger = None;
                true
            }
            _ => false,
        }
    }
}

/// Hands out run tickets; only the newest ticket may publish.
///
/// Cloning shares the counter, so an edit handler and a worker can hold the
/// same `AnalysisRuns`.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRuns {
    current: Arc<AtomicU64>,
}

impl AnalysisRuns {
    /// A fresh counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run, superseding any run in flight.
    #[must_use]
    pub fn start(&self) -> RunTicket {
        let id = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(run = id, "analysis run started");
        RunTicket {
            id,
            current: Arc::clone(&self.current),
        }
    }

    /// Invalidates any run in flight without starting a new one.
    ///
    /// Call this when an edit arrives.
    pub fn invalidate(&self) {
        let id = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation = id, "analysis runs invalidated");
    }
}

/// Permission to publish the result of one run.
#[derive(Debug, Clone)]
pub struct RunTicket {
    id: u64,
    current: Arc<AtomicU64>,
}

impl RunTicket {
    /// This run's number.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Whether no newer run or edit has superseded this one.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.id
    }

    /// Returns the result if the run is still current, or discards it.
    ///
    /// Results are never merged: a superseded run publishes nothing.
    #[must_use]
    pub fn publish<T>(self, result: T) -> Option<T> {
        if self.is_current() {
            Some(result)
        } else {
            debug!(run = self.id, "discarding stale analysis result");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::deep_validate,
        domain::{AnalysisConfig, IndexBuilder, Location, RequirementObject},
    };

    #[test]
    fn bursts_collapse_to_one_run() {
        let start = Instant::now();
        let mut debouncer = Debouncer::from_millis(500);

        assert!(!debouncer.poll(start));
        debouncer.trigger(start);
        debouncer.trigger(start + Duration::from_millis(300));
        assert!(debouncer.is_pending());

        // 500ms after the first trigger, but only 200ms after the second.
        assert!(!debouncer.poll(start + Duration::from_millis(500)));
        assert!(debouncer.poll(start + Duration::from_millis(800)));
        assert!(!debouncer.poll(start + Duration::from_millis(900)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn newer_run_supersedes_older() {
        let runs = AnalysisRuns::new();
        let first = runs.start();
        let second = runs.start();

        assert!(!first.is_current());
        assert!(second.is_current());
        assert_eq!(first.publish("old"), None);
        assert_eq!(second.publish("new"), Some("new"));
    }

    #[test]
    fn edit_during_run_discards_result() {
        let mut builder = IndexBuilder::new();
        let config =
            AnalysisConfig::from_toml_str("_version = \"1\"\ndebounce_ms = 200\n").unwrap();
        let mut debouncer = config.debouncer();
        let runs = AnalysisRuns::new();
        let on_change = runs.clone();
        builder.subscribe(move || on_change.invalidate());
        let start = Instant::now();

        builder.upsert(RequirementObject::new("A", "requirement", Location::new("a.rst", 1)));
        debouncer.trigger(start);
        assert!(!debouncer.poll(start + Duration::from_millis(199)));
        assert!(debouncer.poll(start + Duration::from_millis(200)));
        let snapshot = builder.snapshot();
        let ticket = runs.start();

        // An edit lands while the run is working on its snapshot.
        builder.upsert(RequirementObject::new("B", "requirement", Location::new("a.rst", 2)));

        let report = deep_validate(&snapshot, &config);
        assert_eq!(report.summary.records, 1);
        assert!(ticket.publish(report).is_none());

        let ticket = runs.start();
        let report = deep_validate(&builder.snapshot(), &config);
        assert_eq!(ticket.publish(report).map(|r| r.summary.records), Some(2));
    }
}
