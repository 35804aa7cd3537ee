//! Mock telemetry sink for testing

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::{
    active_lines, exceeding_lines, ActiveSample, TelemetryError, TelemetryResult, TelemetrySink,
};

/// Records every batch as encoded line protocol
#[derive(Clone, Default)]
pub struct MockSink {
    batches: Arc<Mutex<Vec<String>>>,

    /// Configure writes to fail
    pub fail_writes: Arc<Mutex<bool>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches written so far, in order
    pub fn batches(&self) -> Vec<String> {
        self.batches.lock().unwrap().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    fn write(&self, body: String) -> TelemetryResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(TelemetryError::Unavailable("Mock write failure".into()));
        }
        self.batches.lock().unwrap().push(body);
        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for MockSink {
    async fn insert_active(&self, samples: &[ActiveSample]) -> TelemetryResult<()> {
        self.write(active_lines(samples))
    }

    async fn insert_exceeding(&self, names: &BTreeSet<String>) -> TelemetryResult<()> {
        self.write(exceeding_lines(names))
    }

    async fn ping(&self) -> TelemetryResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(TelemetryError::Unavailable("Mock ping failure".into()));
        }
        Ok(())
    }
}
