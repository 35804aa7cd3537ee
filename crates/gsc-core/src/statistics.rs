//! Persistent ledger of unit counters, keyed by match name

use chrono::{DateTime, Local};
use gsc_config::{Limit, MatcherPolicy};
use gsc_store::{CounterStore, StoreResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::UnitCounter;

/// Counters for every (name, unit) pair seen so far
pub struct Statistics {
    store: Arc<dyn CounterStore>,
    cycle: Duration,
}

impl Statistics {
    pub fn new(store: Arc<dyn CounterStore>, cycle: Duration) -> Self {
        Self { store, cycle }
    }

    pub fn cycle(&self) -> Duration {
        self.cycle
    }

    /// Counters loaded after this call use the new cycle for gap tolerance
    pub fn set_cycle(&mut self, cycle: Duration) {
        self.cycle = cycle;
    }

    /// Counter for `name` under `limit`, zeroed if nothing usable is stored
    pub fn get(&self, name: &str, limit: &Limit) -> UnitCounter {
        match self.store.load_counter(name, limit.unit) {
            Ok(Some(record)) => {
                let counter = UnitCounter::from_record(&record, self.cycle);
                if counter.limit() != limit.limit {
                    debug!(
                        name,
                        unit = %limit.unit,
                        stored = counter.limit().as_secs(),
                        configured = limit.limit.as_secs(),
                        "Limit changed"
                    );
                    counter.with_limit(limit.limit)
                } else {
                    counter
                }
            }
            Ok(None) => UnitCounter::new(limit.unit, limit.limit, self.cycle),
            Err(e) => {
                warn!(
                    name,
                    unit = %limit.unit,
                    error = %e,
                    "Failed to load counter, starting fresh"
                );
                UnitCounter::new(limit.unit, limit.limit, self.cycle)
            }
        }
    }

    /// Update and persist one counter per limit. Returns the updated counters.
    pub fn record(&self, name: &str, limits: &[Limit], now: DateTime<Local>) -> Vec<UnitCounter> {
        limits
            .iter()
            .map(|limit| {
                let mut counter = self.get(name, limit);
                counter.update(now);
                if let Err(e) = self.store.save_counter(name, &counter.to_record()) {
                    warn!(name, unit = %limit.unit, error = %e, "Failed to save counter");
                }
                counter
            })
            .collect()
    }

    /// Names with at least one counter at or over its limit in the window
    /// containing `now`
    ///
    /// A counter last updated in an earlier window is spent quota from that
    /// window and does not count.
    pub fn currently_exceeding(&self, now: DateTime<Local>) -> StoreResult<BTreeSet<String>> {
        let exceeding = self
            .store
            .load_all()?
            .into_iter()
            .filter(|(_, record)| {
                let counter = UnitCounter::from_record(record, self.cycle);
                let kind = counter.kind();
                kind.boundary_start(&counter.previous_run()) >= kind.boundary_start(&now)
                    && counter.exceeds_limit(now)
            })
            .map(|(name, _)| name)
            .collect();
        Ok(exceeding)
    }

    /// Drop counters whose rule or unit is no longer configured
    pub fn prune(&self, policy: &MatcherPolicy) -> StoreResult<usize> {
        let mut removed = 0;
        for (name, record) in self.store.load_all()? {
            let configured = policy
                .rules
                .iter()
                .any(|rule| rule.id == name && rule.limits.iter().any(|l| l.unit == record.unit));

            if !configured {
                self.store.remove_counter(&name, record.unit)?;
                info!(name = %name, unit = %record.unit, "Removed counter for unconfigured rule");
                removed += 1;
            }
        }
        Ok(removed)
    }
}
