//! Process table access via procfs

use gsc_host_api::{HostError, HostResult, ProcessInfo};
use nix::errno::Errno;
use nix::sys::signal;
use nix::unistd::Pid;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default procfs mount point
pub const PROC_ROOT: &str = "/proc";

/// Reader for a procfs-style directory tree
#[derive(Debug, Clone)]
pub struct ProcTable {
    root: PathBuf,
}

impl ProcTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot every process under the root. Processes that exit while
    /// being read are skipped.
    pub fn processes(&self) -> HostResult<Vec<ProcessInfo>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            HostError::DiscoveryFailed(format!("Failed to read {}: {}", self.root.display(), e))
        })?;

        let mut processes = Vec::new();
        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };

            match read_process(&entry.path(), pid) {
                Some(process) => processes.push(process),
                None => trace!(pid, "Process vanished during scan"),
            }
        }

        processes.sort_by_key(|p| p.pid);
        debug!(root = %self.root.display(), count = processes.len(), "Process table read");
        Ok(processes)
    }
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::new(PROC_ROOT)
    }
}

fn read_process(dir: &Path, pid: u32) -> Option<ProcessInfo> {
    let name = fs::read_to_string(dir.join("comm")).ok()?.trim_end().to_string();
    let raw_cmdline = fs::read(dir.join("cmdline")).ok()?;

    // Kernel threads have an empty cmdline
    let cmdline = parse_cmdline(&raw_cmdline).unwrap_or_else(|| name.clone());

    Some(ProcessInfo { pid, name, cmdline })
}

/// Join NUL-separated arguments with spaces. `None` when empty.
pub fn parse_cmdline(raw: &[u8]) -> Option<String> {
    let args: Vec<String> = raw
        .split(|b| *b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect();

    if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    }
}

/// Whether this process may send signals to `pid` (signal 0 check)
pub fn can_signal(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    match signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) | Err(Errno::ESRCH) => false,
        Err(e) => {
            debug!(pid, error = %e, "Signal check failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_process(root: &Path, pid: &str, comm: &str, cmdline: &[u8]) {
        let dir = root.join(pid);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("comm"), format!("{}\n", comm)).unwrap();
        fs::write(dir.join("cmdline"), cmdline).unwrap();
    }

    #[test]
    fn test_parse_cmdline() {
        assert_eq!(
            parse_cmdline(b"/usr/games/supertux2\0--fullscreen\0").as_deref(),
            Some("/usr/games/supertux2 --fullscreen")
        );
        assert_eq!(parse_cmdline(b"").as_deref(), None);
        assert_eq!(parse_cmdline(b"\0\0").as_deref(), None);
    }

    #[test]
    fn test_fake_proc_table() {
        let dir = tempfile::tempdir().unwrap();
        fake_process(dir.path(), "200", "supertux2", b"/usr/games/supertux2\0");
        fake_process(dir.path(), "10", "kthreadd", b"");
        // Not a pid directory
        fs::create_dir_all(dir.path().join("sys")).unwrap();
        // Vanished process: directory without files
        fs::create_dir_all(dir.path().join("300")).unwrap();

        let table = ProcTable::new(dir.path());
        let processes = table.processes().unwrap();

        assert_eq!(
            processes,
            vec![
                ProcessInfo::new(10, "kthreadd", "kthreadd"),
                ProcessInfo::new(200, "supertux2", "/usr/games/supertux2"),
            ]
        );
    }

    #[test]
    fn test_missing_root_is_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let table = ProcTable::new(dir.path().join("nope"));
        assert!(matches!(table.processes(), Err(HostError::DiscoveryFailed(_))));
    }

    #[test]
    fn test_real_proc_contains_self() {
        let table = ProcTable::default();
        let processes = table.processes().unwrap();
        assert!(processes.iter().any(|p| p.pid == std::process::id()));
    }

    #[test]
    fn test_can_signal_self() {
        assert!(can_signal(std::process::id()));
    }

    #[test]
    fn test_cannot_signal_out_of_range_pid() {
        assert!(!can_signal(u32::MAX));
    }
}
