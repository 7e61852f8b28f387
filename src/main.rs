use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;
mod hostname;
mod metrics;
mod middleware;
mod poller;
mod redis_client;
mod scheduler;
mod server;
mod transfer;

/// Shared state available to every status handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Written by the collection loop, read by `/api/status`.
    pub status: Arc<metrics::StatusCollector>,
}

/// Polls Redis INFO and forwards selected fields to an Open-Falcon transfer.
#[derive(Parser)]
#[command(name = "redis-metrics", version, about, disable_version_flag = true)]
struct Cli {
    /// Print version.
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "cfg.json")]
    config: PathBuf,

    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    /// Defaults to `debug` when the config sets `"debug": true`, else `info`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::Config::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // ── 1. Logging ───────────────────────────────────────────────
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| if cfg.debug { "debug" } else { "info" }.to_owned());
    let filter = EnvFilter::try_new(&level).with_context(|| format!("invalid log level: {level}"))?;
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    info!(version = env!("CARGO_PKG_VERSION"), config = %cli.config.display(), "starting redis-metrics");

    let cancel = CancellationToken::new();
    let status = Arc::new(metrics::StatusCollector::new());

    // ── 2. Status HTTP surface ───────────────────────────────────
    let http = if cfg.http.enable {
        let listener = tokio::net::TcpListener::bind(&cfg.http.listen)
            .await
            .with_context(|| format!("binding http listener on {}", cfg.http.listen))?;
        info!(listen = %cfg.http.listen, "status endpoint listening");

        let app = server::create_router(Arc::new(AppState {
            status: status.clone(),
        }));
        let shutdown = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                warn!(error = %e, "status endpoint exited");
            }
        }))
    } else {
        None
    };

    // ── 3. Collection loop ───────────────────────────────────────
    let collector = match cfg.collection_plan() {
        Ok(plan) => {
            let transfer = transfer::RpcTransfer::new(
                cfg.transfer.addr.clone(),
                Duration::from_secs(cfg.transfer.timeout),
            );
            let hostname_override = cfg.hostname_override().map(str::to_owned);
            let scheduler = scheduler::Scheduler::new(
                plan,
                cfg.metric_spec(),
                redis_client::RedisConnector,
                transfer,
                move || hostname::resolve(hostname_override.as_deref()),
                status.clone(),
            );
            Some(tokio::spawn(scheduler.run(cancel.clone())))
        }
        Err(reason) => {
            warn!(%reason, "collection not started");
            None
        }
    };

    // ── 4. Wait for shutdown ─────────────────────────────────────
    wait_for_signal().await?;
    cancel.cancel();

    if let Some(handle) = collector {
        join_task("collection loop", handle).await;
    }
    if let Some(handle) = http {
        join_task("status endpoint", handle).await;
    }

    info!("redis-metrics stopped");
    Ok(())
}

/// Waits for a background task; a panic or abort is logged, not propagated.
async fn join_task(name: &'static str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(task = name, error = %e, "task did not finish cleanly");
            false
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).context("registering SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("listening for SIGINT")?;
                info!("received SIGINT, shutting down");
            }
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("listening for ctrl-c")?;
        info!("received ctrl-c, shutting down");
    }
    Ok(())
}
