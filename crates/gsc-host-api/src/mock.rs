//! Mock system adapter for testing

use std::sync::{Arc, Mutex};

use crate::{HostError, HostResult, ProcessInfo, SystemAdapter};

/// Mock system adapter for unit/integration testing
#[derive(Clone, Default)]
pub struct MockSystem {
    running: Arc<Mutex<Vec<ProcessInfo>>>,
    signallable: Arc<Mutex<Option<Vec<ProcessInfo>>>>,

    /// Configure discovery to fail
    pub fail_discovery: Arc<Mutex<bool>>,
}

impl MockSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the running process list. Unless overridden with
    /// [`MockSystem::set_signallable`], every running process is signallable.
    pub fn set_running(&self, processes: Vec<ProcessInfo>) {
        *self.running.lock().unwrap() = processes;
    }

    pub fn set_signallable(&self, processes: Vec<ProcessInfo>) {
        *self.signallable.lock().unwrap() = Some(processes);
    }

    pub fn set_fail_discovery(&self, fail: bool) {
        *self.fail_discovery.lock().unwrap() = fail;
    }

    fn check_failure(&self) -> HostResult<()> {
        if *self.fail_discovery.lock().unwrap() {
            return Err(HostError::DiscoveryFailed("Mock discovery failure".into()));
        }
        Ok(())
    }
}

impl SystemAdapter for MockSystem {
    fn running_processes(&self) -> HostResult<Vec<ProcessInfo>> {
        self.check_failure()?;
        Ok(self.running.lock().unwrap().clone())
    }

    fn signallable_processes(&self) -> HostResult<Vec<ProcessInfo>> {
        self.check_failure()?;
        match self.signallable.lock().unwrap().as_ref() {
            Some(processes) => Ok(processes.clone()),
            None => Ok(self.running.lock().unwrap().clone()),
        }
    }
}
