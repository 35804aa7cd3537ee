//! Host adapter traits

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Process discovery failed: {0}")]
    DiscoveryFailed(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// A process observed on the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,

    /// Short executable name
    pub name: String,

    /// Full command line, arguments separated by spaces
    pub cmdline: String,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>, cmdline: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cmdline: cmdline.into(),
        }
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.pid, self.cmdline)
    }
}

/// System adapter trait - implemented by platform-specific adapters
pub trait SystemAdapter: Send + Sync {
    /// Every process currently running
    fn running_processes(&self) -> HostResult<Vec<ProcessInfo>>;

    /// Processes this daemon is permitted to signal
    fn signallable_processes(&self) -> HostResult<Vec<ProcessInfo>>;

    /// Optional: check if the adapter is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}
