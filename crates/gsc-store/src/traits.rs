//! Store trait definitions

use gsc_util::UnitKind;
use serde::{Deserialize, Serialize};

use crate::StoreResult;

/// Persisted form of a unit counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub unit: UnitKind,

    /// Quota ceiling in seconds
    pub limit: u64,

    /// Active seconds in the current window
    pub active: u64,

    /// Last update, nanoseconds since the UNIX epoch
    pub previous_run: i64,
}

/// Counter store, keyed by entity name and unit
pub trait CounterStore: Send + Sync {
    /// Load one counter. Missing and unreadable records both yield `None`.
    fn load_counter(&self, name: &str, unit: UnitKind) -> StoreResult<Option<CounterRecord>>;

    /// Insert or replace one counter
    fn save_counter(&self, name: &str, record: &CounterRecord) -> StoreResult<()>;

    /// Every readable counter, ordered by name then unit
    fn load_all(&self) -> StoreResult<Vec<(String, CounterRecord)>>;

    /// Forget a counter
    fn remove_counter(&self, name: &str, unit: UnitKind) -> StoreResult<()>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
