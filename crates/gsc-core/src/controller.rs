//! The session control loop

use chrono::{DateTime, Local};
use gsc_config::{example_config, load_config, write_config, ConfigError, Policy};
use gsc_host_api::{HostError, SystemAdapter};
use gsc_store::CounterStore;
use gsc_telemetry::{ActiveSample, TelemetrySink};
use gsc_util::example_config_path;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{Enforcer, Match, Matcher, RunningStrategy, Statistics};

/// Control loop errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(
        "Configuration file {} does not exist, see {} as an example to create one",
        .path.display(),
        .example.display()
    )]
    ConfigMissing { path: PathBuf, example: PathBuf },

    #[error("Path exists but is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Invalid configuration {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("Process discovery failed: {0}")]
    Discovery(#[from] HostError),
}

impl CoreError {
    /// Whether the loop must stop
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CoreError::Discovery(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Outcome of one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Number of running processes
    pub running: usize,
    /// Number of processes we may signal
    pub signallable: usize,
    pub matches: Vec<Match>,
    pub exceeding: BTreeSet<String>,
}

/// Check that the configuration file is usable and load it.
///
/// A missing file is replaced by an example next to it, and still fails.
pub fn bootstrap(config_path: &Path) -> CoreResult<Policy> {
    ensure_config_file(config_path)?;
    load_config(config_path).map_err(|source| CoreError::Config {
        path: config_path.to_path_buf(),
        source,
    })
}

fn ensure_config_file(config_path: &Path) -> CoreResult<()> {
    if !config_path.exists() {
        let example = example_config_path(config_path);
        write_config(&example, &example_config()).map_err(|source| CoreError::Config {
            path: example.clone(),
            source,
        })?;
        warn!(example = %example.display(), "Wrote example configuration");
        return Err(CoreError::ConfigMissing {
            path: config_path.to_path_buf(),
            example,
        });
    }

    if !config_path.is_file() {
        return Err(CoreError::NotAFile(config_path.to_path_buf()));
    }

    Ok(())
}

/// Reloads configuration, tracks matching applications and reports the
/// ones over quota, once per cycle
pub struct SessionController {
    config_path: PathBuf,
    matcher: Matcher,
    statistics: Statistics,
    system: Arc<dyn SystemAdapter>,
    telemetry: Arc<dyn TelemetrySink>,
    enforcer: Arc<dyn Enforcer>,
}

impl SessionController {
    /// Create a controller. Fails like [`bootstrap`] does.
    pub fn new(
        config_path: impl Into<PathBuf>,
        system: Arc<dyn SystemAdapter>,
        store: Arc<dyn CounterStore>,
        telemetry: Arc<dyn TelemetrySink>,
        enforcer: Arc<dyn Enforcer>,
    ) -> CoreResult<Self> {
        let config_path = config_path.into();
        let policy = bootstrap(&config_path)?;

        let mut controller = Self {
            config_path,
            matcher: Matcher::new(policy.matcher.clone()),
            statistics: Statistics::new(store, policy.daemon.cycle),
            system,
            telemetry,
            enforcer,
        };
        controller.apply_policy(policy);

        info!(
            config = %controller.config_path.display(),
            matcher = controller.matcher.name(),
            rules = controller.matcher.rule_count(),
            "Session controller initialized"
        );

        Ok(controller)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Run cycles for as long as the strategy asks for them
    pub async fn run(&mut self, strategy: &mut dyn RunningStrategy) -> CoreResult<()> {
        while strategy.next_cycle().await {
            match self.run_cycle(gsc_util::now()).await {
                Ok(report) => debug!(
                    running = report.running,
                    matches = report.matches.len(),
                    exceeding = report.exceeding.len(),
                    "Cycle complete"
                ),
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Stopping session controller");
                    return Err(e);
                }
                Err(e) => warn!(error = %e, "Cycle skipped"),
            }
        }

        info!("Running strategy finished");
        Ok(())
    }

    /// One full cycle at `now`
    pub async fn run_cycle(&mut self, now: DateTime<Local>) -> CoreResult<CycleReport> {
        info!("=====> Next cycle <=====");

        self.reload()?;

        let running = self.system.running_processes()?;
        info!(count = running.len(), "Running processes found");

        let signallable = self.system.signallable_processes()?;
        info!(count = signallable.len(), "Signallable processes found");

        let matches = self.matcher.matches(&signallable);
        info!(count = matches.len(), "Matches found");

        let samples: Vec<ActiveSample> = matches
            .iter()
            .map(|m| ActiveSample::new(m.name.clone(), m.ratio))
            .collect();
        if let Err(e) = self.telemetry.insert_active(&samples).await {
            warn!(series = "active", error = %e, "Telemetry push failed");
        }

        for m in &matches {
            for counter in self.statistics.record(&m.name, &m.limits, now) {
                info!(name = %m.name, counter = %counter, "{}", m);
            }
        }

        let exceeding = match self.statistics.currently_exceeding(now) {
            Ok(exceeding) => exceeding,
            Err(e) => {
                warn!(error = %e, "Failed to read counters, assuming nothing exceeds");
                BTreeSet::new()
            }
        };
        info!(count = exceeding.len(), "Exceeding applications found");
        for name in &exceeding {
            info!(name = %name, "Exceeding");
        }

        if let Err(e) = self.telemetry.insert_exceeding(&exceeding).await {
            warn!(series = "exceeding", error = %e, "Telemetry push failed");
        }

        self.enforcer.enforce(&exceeding, &matches);

        Ok(CycleReport {
            running: running.len(),
            signallable: signallable.len(),
            matches,
            exceeding,
        })
    }

    /// Re-read the configuration. An invalid file keeps the current policy.
    fn reload(&mut self) -> CoreResult<()> {
        ensure_config_file(&self.config_path)?;

        match load_config(&self.config_path) {
            Ok(policy) => self.apply_policy(policy),
            Err(e) => warn!(
                path = %self.config_path.display(),
                error = %e,
                "Invalid configuration, keeping previous policy"
            ),
        }
        Ok(())
    }

    fn apply_policy(&mut self, policy: Policy) {
        if policy.daemon.cycle != self.statistics.cycle() {
            info!(
                old = self.statistics.cycle().as_secs(),
                new = policy.daemon.cycle.as_secs(),
                "Cycle length changed"
            );
            self.statistics.set_cycle(policy.daemon.cycle);
        }

        if let Err(e) = self.statistics.prune(&policy.matcher) {
            warn!(error = %e, "Failed to prune counters");
        }

        self.matcher = Matcher::new(policy.matcher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::tests::RecordingEnforcer;
    use chrono::TimeZone;
    use gsc_host_api::{MockSystem, ProcessInfo};
    use gsc_store::SqliteStore;
    use gsc_telemetry::MockSink;
    use gsc_util::UnitKind;
    use std::time::Duration;

    const CONFIG: &str = r#"
        config_version = 1

        [daemon]
        cycle_seconds = 60

        [[matcher.rules]]
        id = "tux"
        include = ["supertux"]
        limits = [{ unit = "day", seconds = 120 }]

        [[matcher.rules]]
        id = "chess"
        include = ["chess"]
        limits = [{ unit = "day", seconds = 3600 }, { unit = "week", seconds = 7200 }]
    "#;

    struct Harness {
        _dir: tempfile::TempDir,
        config_path: PathBuf,
        system: MockSystem,
        store: Arc<SqliteStore>,
        sink: MockSink,
        enforcer: RecordingEnforcer,
        controller: SessionController,
    }

    fn harness(config: &str) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("gsc.config.toml");
        std::fs::write(&config_path, config).unwrap();

        let system = MockSystem::new();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let sink = MockSink::new();
        let enforcer = RecordingEnforcer::default();

        let controller = SessionController::new(
            &config_path,
            Arc::new(system.clone()),
            store.clone(),
            Arc::new(sink.clone()),
            Arc::new(enforcer.clone()),
        )
        .unwrap();

        Harness {
            _dir: dir,
            config_path,
            system,
            store,
            sink,
            enforcer,
            controller,
        }
    }

    fn morning() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 18, 9, 0, 0).unwrap()
    }

    fn minutes(n: i64) -> chrono::Duration {
        chrono::Duration::minutes(n)
    }

    fn tux() -> ProcessInfo {
        ProcessInfo::new(100, "supertux2", "/usr/games/supertux2")
    }

    fn shell() -> ProcessInfo {
        ProcessInfo::new(1, "bash", "/bin/bash")
    }

    #[test]
    fn new_fails_without_config_and_writes_example() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("etc").join("gsc.config.toml");

        let result = SessionController::new(
            &config_path,
            Arc::new(MockSystem::new()),
            Arc::new(SqliteStore::in_memory().unwrap()),
            Arc::new(MockSink::new()),
            Arc::new(RecordingEnforcer::default()),
        );

        let Err(err) = result else {
            panic!("expected missing configuration");
        };
        assert!(err.is_fatal());
        let example = dir.path().join("etc").join("gsc.config.example.toml");
        assert!(matches!(&err, CoreError::ConfigMissing { example: e, .. } if *e == example));
        assert!(err.to_string().contains("gsc.config.toml does not exist"));

        let policy = load_config(&example).unwrap();
        assert!(policy.get_rule("example").is_some());
        assert!(!config_path.exists());
    }

    #[test]
    fn bootstrap_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = bootstrap(dir.path());
        assert!(matches!(result, Err(CoreError::NotAFile(_))));
    }

    #[test]
    fn bootstrap_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gsc.config.toml");
        let content = "config_version = 1\n[[matcher.rules]]\nid = \"x\"\ninclude = [\"(\"]\n";
        std::fs::write(&path, content).unwrap();

        let result = bootstrap(&path);
        assert!(matches!(result, Err(CoreError::Config { .. })));
    }

    #[tokio::test]
    async fn cycle_tracks_and_reports_exceeding() {
        let mut h = harness(CONFIG);
        h.system.set_running(vec![shell(), tux()]);
        let start = morning();

        // Reset, +60s, +120s: over the two minute quota on the third cycle
        for i in 0..3 {
            let report = h.controller.run_cycle(start + minutes(i)).await.unwrap();
            assert_eq!(report.running, 2);
            assert_eq!(report.signallable, 2);
            assert_eq!(report.matches.len(), 1);
            assert_eq!(report.matches[0].name, "tux");
            assert_eq!(report.matches[0].ratio, 0.5);
            assert_eq!(report.exceeding.contains("tux"), i == 2, "cycle {}", i);
        }

        let record = h.store.load_counter("tux", UnitKind::Day).unwrap().unwrap();
        assert_eq!(record.active, 120);
        assert!(h.store.load_counter("chess", UnitKind::Day).unwrap().is_none());

        let batches = h.sink.batches();
        assert_eq!(batches.len(), 6);
        assert_eq!(batches[0], "active system=1.0\nactive tux=0.5\n");
        assert_eq!(batches[1], "exceeding system=1.0\n");
        assert_eq!(batches[5], "exceeding system=1.0\nexceeding tux=1.0\n");

        let seen = h.enforcer.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[2].contains("tux"));
    }

    #[tokio::test]
    async fn only_signallable_processes_are_matched() {
        let mut h = harness(CONFIG);
        h.system.set_running(vec![shell(), tux()]);
        h.system.set_signallable(vec![shell()]);

        let report = h.controller.run_cycle(morning()).await.unwrap();
        assert_eq!(report.running, 2);
        assert_eq!(report.signallable, 1);
        assert!(report.matches.is_empty());
    }

    #[tokio::test]
    async fn exceeding_lasts_until_the_window_ends() {
        let mut h = harness(CONFIG);
        h.system.set_running(vec![tux()]);
        let start = morning();
        for i in 0..3 {
            h.controller.run_cycle(start + minutes(i)).await.unwrap();
        }

        h.system.set_running(vec![shell()]);
        let report = h.controller.run_cycle(start + minutes(3)).await.unwrap();
        assert!(report.matches.is_empty());
        assert!(report.exceeding.contains("tux"));

        // Yesterday's quota no longer counts, even before the next sighting
        let tomorrow = start + chrono::Duration::days(1);
        let report = h.controller.run_cycle(tomorrow).await.unwrap();
        assert!(report.exceeding.is_empty());
        let batches = h.sink.batches();
        assert_eq!(batches.last().unwrap(), "exceeding system=1.0\n");

        // Seen again: the counter starts over
        h.system.set_running(vec![tux()]);
        let report = h.controller.run_cycle(tomorrow + minutes(1)).await.unwrap();
        assert!(!report.exceeding.contains("tux"));
        let record = h.store.load_counter("tux", UnitKind::Day).unwrap().unwrap();
        assert_eq!(record.active, 0);
    }

    #[tokio::test]
    async fn telemetry_failure_keeps_exceeding_set() {
        let mut h = harness(CONFIG);
        h.system.set_running(vec![tux()]);
        let start = morning();
        for i in 0..2 {
            h.controller.run_cycle(start + minutes(i)).await.unwrap();
        }

        h.sink.set_fail_writes(true);
        let report = h.controller.run_cycle(start + minutes(2)).await.unwrap();
        assert!(report.exceeding.contains("tux"));
        assert_eq!(h.sink.batches().len(), 4);
        assert_eq!(h.enforcer.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn discovery_failure_is_not_fatal() {
        let mut h = harness(CONFIG);
        h.system.set_fail_discovery(true);

        let err = h.controller.run_cycle(morning()).await.unwrap_err();
        assert!(matches!(err, CoreError::Discovery(_)));
        assert!(!err.is_fatal());
        assert!(h.enforcer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_reload_keeps_policy() {
        let mut h = harness(CONFIG);
        h.system.set_running(vec![tux()]);

        std::fs::write(&h.config_path, "this is not toml [").unwrap();
        let report = h.controller.run_cycle(morning()).await.unwrap();
        assert_eq!(report.matches.len(), 1);
        assert_eq!(h.controller.matcher().rule_count(), 2);
    }

    #[tokio::test]
    async fn reload_applies_new_rules_and_prunes() {
        let mut h = harness(CONFIG);
        h.system.set_running(vec![tux(), ProcessInfo::new(200, "gnuchess", "gnuchess")]);
        let start = morning();
        h.controller.run_cycle(start).await.unwrap();
        assert_eq!(h.store.load_all().unwrap().len(), 3);

        std::fs::write(
            &h.config_path,
            r#"
            config_version = 1

            [daemon]
            cycle_seconds = 30

            [[matcher.rules]]
            id = "chess"
            include = ["chess"]
            limits = [{ unit = "day", seconds = 3600 }]
            "#,
        )
        .unwrap();

        let report = h.controller.run_cycle(start + minutes(1)).await.unwrap();
        let names: Vec<&str> = report.matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["chess"]);
        assert_eq!(h.controller.statistics().cycle(), Duration::from_secs(30));

        let stored: Vec<(String, UnitKind)> = h
            .store
            .load_all()
            .unwrap()
            .into_iter()
            .map(|(name, r)| (name, r.unit))
            .collect();
        assert_eq!(stored, vec![("chess".to_string(), UnitKind::Day)]);
    }

    #[tokio::test]
    async fn removed_config_is_fatal_mid_run() {
        let mut h = harness(CONFIG);
        std::fs::remove_file(&h.config_path).unwrap();

        let err = h.controller.run_cycle(morning()).await.unwrap_err();
        assert!(matches!(err, CoreError::ConfigMissing { .. }));
        assert!(err.is_fatal());
        assert!(example_config_path(&h.config_path).exists());
    }

    #[tokio::test]
    async fn run_follows_strategy() {
        let mut h = harness(CONFIG);
        h.system.set_running(vec![tux()]);

        h.controller.run(&mut crate::Repeat(3)).await.unwrap();
        assert_eq!(h.enforcer.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn run_survives_discovery_failure_and_stops_on_fatal() {
        let mut h = harness(CONFIG);
        h.system.set_fail_discovery(true);
        h.controller.run(&mut crate::Repeat(2)).await.unwrap();
        assert!(h.enforcer.seen.lock().unwrap().is_empty());

        std::fs::remove_file(&h.config_path).unwrap();
        let result = h.controller.run(&mut crate::Repeat(5)).await;
        assert!(matches!(result, Err(CoreError::ConfigMissing { .. })));
    }
}
