//! wrangler - labware reconciliation service
//!
//! Reconciles tube rack layout CSVs and warehouse (MLWH) rows, then
//! registers the labware with the downstream LIMS. Serves the HTTP API and,
//! when enabled, runs the extraction job on a fixed interval.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use wrangler::lims::SequencescapeClient;
use wrangler::{build_router, jobs, AppState};
use wrangler_common::config::WranglerConfig;
use wrangler_common::db::{self, MlwhDatabase};

/// Command-line arguments for wrangler
#[derive(Parser, Debug)]
#[command(name = "wrangler")]
#[command(about = "Labware reconciliation service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "WRANGLER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides server.bind_addr)
    #[arg(short, long)]
    bind: Option<String>,

    /// Run the extraction job once and exit
    #[arg(long)]
    run_job_once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise the configured level replaces the default
    // once the config is loaded.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let level_from_config = env_filter.is_none();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| log_filter(DEFAULT_LOG_LEVEL)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting wrangler v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = WranglerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    if level_from_config {
        if let Err(e) = filter_handle.reload(log_filter(&config.logging.level)) {
            warn!("Failed to apply log level '{}': {}", config.logging.level, e);
        }
    }

    let pool = db::connect(&config.mlwh)
        .await
        .context("Failed to connect to the MLWH")?;
    info!("✓ Connected to MLWH {}:{}/{}", config.mlwh.host, config.mlwh.port, config.mlwh.database);

    let warehouse = MlwhDatabase::new(pool, config.mlwh.table.clone());
    let lims = SequencescapeClient::new(&config.lims).context("Failed to create LIMS client")?;

    let config = Arc::new(config);
    let state = AppState::new(Arc::new(warehouse), Arc::new(lims), config.clone());

    if args.run_job_once {
        let summary = jobs::extraction::run(&state).await?;
        info!(
            "Extraction job complete: {} created, {} failed",
            summary.created.len(),
            summary.failed.len()
        );
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let scheduler = config.job.enabled.then(|| {
        jobs::spawn_scheduler(
            state.clone(),
            Duration::from_secs(config.job.interval_secs),
            shutdown.clone(),
        )
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;
    info!("wrangler listening on http://{}", config.server.bind_addr);
    info!("Health check: http://{}/health", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    shutdown.cancel();
    if let Some(scheduler) = scheduler {
        scheduler.await.context("Scheduler task panicked")?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Level used until the config is loaded
const DEFAULT_LOG_LEVEL: &str = "info";

/// Filter for this service's crates at `level`
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "wrangler={level},wrangler_common={level},tower_http={level}"
    ))
}

/// Resolves on Ctrl+C or SIGTERM, cancelling `shutdown`
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    shutdown.cancel();
}
