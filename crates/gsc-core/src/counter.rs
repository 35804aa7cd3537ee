//! Per-entity quota accumulator for one calendar unit

use chrono::{DateTime, Local};
use gsc_store::CounterRecord;
use gsc_util::{epoch, format_datetime_full, from_epoch_nanos, to_epoch_nanos, UnitKind};
use std::fmt;
use std::time::Duration;
use tracing::trace;

/// Active time of one entity inside the current day or week
///
/// `limit` and `cycle` are fixed for the lifetime of a counter. `update` is
/// the only mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitCounter {
    kind: UnitKind,
    limit: Duration,
    cycle: Duration,
    active: Duration,
    previous_run: DateTime<Local>,
}

impl UnitCounter {
    /// Fresh counter that has never been updated
    pub fn new(kind: UnitKind, limit: Duration, cycle: Duration) -> Self {
        Self {
            kind,
            limit,
            cycle,
            active: Duration::ZERO,
            previous_run: epoch(),
        }
    }

    /// Rebuild a counter from its persisted form
    pub fn from_record(record: &CounterRecord, cycle: Duration) -> Self {
        Self {
            kind: record.unit,
            limit: Duration::from_secs(record.limit),
            cycle,
            active: Duration::from_secs(record.active),
            previous_run: from_epoch_nanos(record.previous_run),
        }
    }

    /// Persisted form
    pub fn to_record(&self) -> CounterRecord {
        CounterRecord {
            unit: self.kind,
            limit: self.limit.as_secs(),
            active: self.active.as_secs(),
            previous_run: to_epoch_nanos(&self.previous_run),
        }
    }

    /// Same progress under a different quota
    pub fn with_limit(self, limit: Duration) -> Self {
        Self { limit, ..self }
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn cycle(&self) -> Duration {
        self.cycle
    }

    pub fn active(&self) -> Duration {
        self.active
    }

    pub fn previous_run(&self) -> DateTime<Local> {
        self.previous_run
    }

    /// Whether the quota is used up. Only depends on the accumulated time.
    pub fn exceeds_limit(&self, _now: DateTime<Local>) -> bool {
        self.active >= self.limit
    }

    /// Record an observation at `now`.
    ///
    /// The first observation inside a new unit resets the counter. An
    /// observation more than 1.5 cycles after the previous one only moves the
    /// timestamp. Anything else credits the elapsed whole seconds.
    pub fn update(&mut self, now: DateTime<Local>) {
        let prior = std::mem::replace(&mut self.previous_run, now);

        if self.is_new_unit(&now, &prior) {
            trace!(
                unit = %self.kind,
                prior = %format_datetime_full(&prior),
                "New unit, resetting active time"
            );
            self.active = Duration::ZERO;
            return;
        }

        if !self.is_consecutive_run(&prior, &now) {
            trace!(
                unit = %self.kind,
                prior = %format_datetime_full(&prior),
                now = %format_datetime_full(&now),
                "Not a consecutive run"
            );
            return;
        }

        // A clock stepping backwards inside the tolerance credits nothing
        let elapsed = (now - prior).to_std().unwrap_or_default();
        self.active += Duration::from_secs(elapsed.as_secs());
    }

    // Strict comparison: a clock rollback across a boundary does not reset
    fn is_new_unit(&self, now: &DateTime<Local>, prior: &DateTime<Local>) -> bool {
        self.kind.boundary_start(now) > self.kind.boundary_start(prior)
    }

    fn is_consecutive_run(&self, prior: &DateTime<Local>, now: &DateTime<Local>) -> bool {
        let tolerance = chrono::Duration::from_std(self.cycle.saturating_mul(3) / 2)
            .unwrap_or(chrono::TimeDelta::MAX);
        match now.checked_sub_signed(tolerance) {
            Some(earliest) => *prior >= earliest,
            None => true,
        }
    }
}

impl fmt::Display for UnitCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unit: {}, Limit: {}s, Active: {}s",
            self.kind,
            self.limit.as_secs(),
            self.active.as_secs()
        )
    }
}
