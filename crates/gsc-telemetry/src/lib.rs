//! Telemetry sink for gscd
//!
//! Each cycle pushes two series:
//! - `active`: one field per matched rule, valued with its process ratio
//! - `exceeding`: one field per rule over quota
//!
//! Both always carry a `system=1.0` field so an idle cycle is still visible.

mod influx;
mod line;
mod mock;

pub use influx::*;
pub use line::*;
pub use mock::*;

use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

/// Telemetry errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {actual} (expected {expected})")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// A matched rule as reported to the `active` series
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSample {
    pub name: String,
    pub ratio: f64,
}

impl ActiveSample {
    pub fn new(name: impl Into<String>, ratio: f64) -> Self {
        Self {
            name: name.into(),
            ratio,
        }
    }
}

/// Destination for per-cycle telemetry
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Push the active match set
    async fn insert_active(&self, samples: &[ActiveSample]) -> TelemetryResult<()>;

    /// Push the exceeding name set
    async fn insert_exceeding(&self, names: &BTreeSet<String>) -> TelemetryResult<()>;

    /// Health check
    async fn ping(&self) -> TelemetryResult<()>;
}

/// Sink that discards everything, used when telemetry is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl TelemetrySink for NullSink {
    async fn insert_active(&self, _samples: &[ActiveSample]) -> TelemetryResult<()> {
        Ok(())
    }

    async fn insert_exceeding(&self, _names: &BTreeSet<String>) -> TelemetryResult<()> {
        Ok(())
    }

    async fn ping(&self) -> TelemetryResult<()> {
        Ok(())
    }
}
