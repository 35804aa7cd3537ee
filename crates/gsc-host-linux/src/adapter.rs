//! Linux system adapter implementation

use gsc_host_api::{HostResult, ProcessInfo, SystemAdapter};
use tracing::debug;

use crate::process::{can_signal, ProcTable};

/// Linux system adapter
#[derive(Debug, Clone, Default)]
pub struct LinuxSystem {
    table: ProcTable,
}

impl LinuxSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter reading an alternate procfs root
    pub fn with_proc_root(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            table: ProcTable::new(root),
        }
    }
}

impl SystemAdapter for LinuxSystem {
    fn running_processes(&self) -> HostResult<Vec<ProcessInfo>> {
        self.table.processes()
    }

    fn signallable_processes(&self) -> HostResult<Vec<ProcessInfo>> {
        let own_pid = std::process::id();
        let signallable: Vec<ProcessInfo> = self
            .table
            .processes()?
            .into_iter()
            .filter(|p| p.pid != own_pid && can_signal(p.pid))
            .collect();

        debug!(count = signallable.len(), "Signallable processes found");
        Ok(signallable)
    }

    fn is_healthy(&self) -> bool {
        self.table.root().is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signallable_excludes_self() {
        let system = LinuxSystem::new();
        assert!(!system.running_processes().unwrap().is_empty());

        let signallable = system.signallable_processes().unwrap();
        assert!(signallable.iter().all(|p| p.pid != std::process::id()));
        assert!(system.is_healthy());
    }

    #[test]
    fn missing_root_is_unhealthy() {
        let system = LinuxSystem::with_proc_root("/definitely/not/proc");
        assert!(!system.is_healthy());
        assert!(system.running_processes().is_err());
    }
}
