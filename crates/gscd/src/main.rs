//! gscd - The gsc background service
//!
//! This is the main entry point for the gscd service.
//! It wires together all the components:
//! - Configuration bootstrap
//! - Counter store
//! - Telemetry sink
//! - Process discovery (Linux)
//! - Session controller on a fixed interval

use anyhow::{Context, Result};
use clap::Parser;
use gsc_config::Policy;
use gsc_core::{FixedInterval, LogEnforcer, SessionController};
use gsc_host_api::SystemAdapter;
use gsc_host_linux::LinuxSystem;
use gsc_store::{CounterStore, SqliteStore};
use gsc_telemetry::{InfluxSink, NullSink, TelemetrySink};
use gsc_util::{default_config_path, format_duration, is_mock_time_active};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// gscd - Daily and weekly time quotas for applications
#[derive(Parser, Debug)]
#[command(name = "gscd")]
#[command(about = "Tracks daily and weekly time quotas for applications", long_about = None)]
struct Args {
    /// Configuration file path (default: etc/gsc.config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set GSC_DATA_DIR env var)
    #[arg(short, long, env = "GSC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    controller: SessionController,
    strategy: FixedInterval,
    shutdown: watch::Sender<bool>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        // Missing configuration writes an example and stops here
        let policy = gsc_core::bootstrap(&args.config)?;

        info!(
            config_path = %args.config.display(),
            rule_count = policy.matcher.rules.len(),
            cycle = %format_duration(policy.daemon.cycle),
            "Configuration loaded"
        );

        let store = Self::open_store(args, &policy)?;
        let telemetry = Self::connect_telemetry(&policy).await?;
        let system = Arc::new(LinuxSystem::new());

        if !system.is_healthy() {
            warn!("Process table unavailable, cycles will be skipped");
        }

        let controller = SessionController::new(
            &args.config,
            system,
            store,
            telemetry,
            Arc::new(LogEnforcer),
        )?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let strategy = FixedInterval::new(policy.daemon.cycle, shutdown_rx);

        Ok(Self {
            controller,
            strategy,
            shutdown,
        })
    }

    fn open_store(args: &Args, policy: &Policy) -> Result<Arc<dyn CounterStore>> {
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.daemon.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(&policy.daemon.counts_file);
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open counter database {:?}", db_path))?;

        if !store.is_healthy() {
            warn!(db_path = %db_path.display(), "Counter database failed its health check");
        }

        info!(db_path = %db_path.display(), "Store initialized");
        Ok(Arc::new(store))
    }

    async fn connect_telemetry(policy: &Policy) -> Result<Arc<dyn TelemetrySink>> {
        let config = &policy.telemetry;
        if !config.enabled {
            info!("Telemetry disabled");
            return Ok(Arc::new(NullSink));
        }

        let sink = InfluxSink::connect(&config.url, &config.database, config.timeout)
            .await
            .with_context(|| format!("Failed to set up telemetry database at {}", config.url))?;

        if let Err(e) = sink.ping().await {
            warn!(error = %e, "Telemetry ping failed");
        }

        Ok(Arc::new(sink))
    }

    async fn run(mut self) -> Result<()> {
        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        let shutdown = self.shutdown;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
                _ = sighup.recv() => info!("Received SIGHUP, shutting down gracefully"),
            }
            let _ = shutdown.send(true);
        });

        info!(
            period = %format_duration(self.strategy.period()),
            "Service running"
        );

        self.controller.run(&mut self.strategy).await?;

        info!("Shutdown complete");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mock_time = is_mock_time_active(),
        "gscd starting"
    );

    // Create and run the service
    let service = Service::new(&args).await?;
    service.run().await
}
