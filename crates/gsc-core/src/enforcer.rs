//! What happens to applications over quota

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::Match;

/// Receives the exceeding set at the end of every cycle
pub trait Enforcer: Send + Sync {
    fn enforce(&self, exceeding: &BTreeSet<String>, matches: &[Match]);
}

/// Reports exceeding applications without touching them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEnforcer;

impl Enforcer for LogEnforcer {
    fn enforce(&self, exceeding: &BTreeSet<String>, matches: &[Match]) {
        for name in exceeding {
            match matches.iter().find(|m| &m.name == name) {
                Some(m) => {
                    let pids: Vec<u32> = m.processes.iter().map(|p| p.pid).collect();
                    warn!(name = %name, pids = ?pids, "Application over quota is running");
                }
                None => info!(name = %name, "Application over quota, not running"),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Enforcer remembering every exceeding set it was handed
    #[derive(Clone, Default)]
    pub(crate) struct RecordingEnforcer {
        pub seen: Arc<Mutex<Vec<BTreeSet<String>>>>,
    }

    impl Enforcer for RecordingEnforcer {
        fn enforce(&self, exceeding: &BTreeSet<String>, _matches: &[Match]) {
            self.seen.lock().unwrap().push(exceeding.clone());
        }
    }

    #[test]
    fn log_enforcer_handles_running_and_absent() {
        let exceeding: BTreeSet<String> = ["absent", "tux"].iter().map(|s| s.to_string()).collect();
        let matches = vec![Match {
            name: "tux".into(),
            processes: vec![gsc_host_api::ProcessInfo::new(7, "supertux2", "supertux2")],
            ratio: 1.0,
            limits: vec![],
        }];
        LogEnforcer.enforce(&exceeding, &matches);
    }
}
