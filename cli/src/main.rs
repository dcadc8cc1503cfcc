//! DASHMET sync daemon - binary entry point.
//!
//! Wires both execution contexts together and runs them as independent
//! tokio tasks:
//!
//! ```text
//! main() -> DashmetConfig::load() -> worker task (install/activate/sync)
//!                                 -> poller task (timer + visibility)
//!                                 -> ctrl-c -> shutdown watch -> join
//! ```
//!
//! The host surfaces (notification display, window registry, permission,
//! page visibility) are headless implementations here: notifications land
//! in the log, the "page" is permanently hidden so every poll tick syncs.
//! A real host embeds `dashmet-engine` and supplies its own seams.

mod host;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use dashmet_engine::{
    DashmetConfig, ForegroundPoller, Presenter, SYNC_TAG, SyncCoordinator,
};
use dashmet_store::LocalStore;
use dashmet_types::PermissionState;

use host::{HeadlessPage, HeadlessPermissions, HeadlessWindows, LogSink};

/// How often the daemon fires the platform's background sync trigger.
/// In a browser this cadence belongs to connectivity-recovery heuristics;
/// headless, a fixed timer stands in for it.
const BACKGROUND_SYNC_INTERVAL: Duration = Duration::from_secs(60);

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_config_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config_path = parse_config_arg();
    let config = DashmetConfig::load(config_path.as_deref()).context("loading configuration")?;
    tracing::info!(
        base_url = %config.base_url(),
        cache_version = config.cache_version(),
        "Starting DASHMET sync daemon"
    );

    let sink = std::sync::Arc::new(LogSink);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Worker context: install, activate, then periodic background sync.
    let mut coordinator = SyncCoordinator::new(
        config.base_url().clone(),
        config.cache_dir(),
        config.cache_version().to_string(),
        config.manifest().to_vec(),
        Presenter::new(sink.clone(), PermissionState::Granted),
        Box::new(HeadlessWindows),
    );
    let mut worker_shutdown = shutdown_rx.clone();
    let worker = tokio::spawn(async move {
        if let Err(e) = coordinator.install().await {
            tracing::error!("Worker install failed: {e:#}");
            return;
        }
        match coordinator.activate() {
            Ok(pruned) => tracing::info!(pruned, "Worker activated"),
            Err(e) => {
                tracing::error!("Worker activation failed: {e:#}");
                return;
            }
        }

        let mut ticker = tokio::time::interval(BACKGROUND_SYNC_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    coordinator.handle_sync(SYNC_TAG).await;
                }
                _ = worker_shutdown.changed() => {
                    tracing::info!("Worker shutting down");
                    return;
                }
            }
        }
    });

    // Page context: the foreground poller with its own checkpoint.
    let local = LocalStore::load(config.settings_path());
    let mut permissions = HeadlessPermissions;
    let poller = ForegroundPoller::start(
        config.base_url().clone(),
        local,
        sink,
        &mut permissions,
        Box::new(HeadlessPage),
    );
    // Headless: no visibility events arrive, the timer does all the work.
    let (_visibility_tx, visibility_rx) = mpsc::channel(8);
    let poller_task = tokio::spawn(poller.run(
        config.poll_interval(),
        visibility_rx,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    tracing::info!("Received ctrl-c, shutting down");
    let _ = shutdown_tx.send(true);

    let _ = worker.await;
    let _ = poller_task.await;
    Ok(())
}
