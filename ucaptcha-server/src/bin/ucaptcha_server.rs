//! uCaptcha server binary: loads configuration, installs logging, performs
//! the initial key pool fill, spawns the rotation task, and serves the
//! HTTP surface.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use ucaptcha_common::config::Config;
use ucaptcha_server::{build_app_state, create_router, run_rotation_task};

#[derive(Parser, Debug)]
#[command(name = "ucaptcha-server")]
#[command(about = "RSW time-lock puzzle captcha server", long_about = None)]
struct Args {
    /// Path to a YAML configuration file (optional; environment variables
    /// and built-in defaults still apply if this is absent).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Configuration must load before logging so a bad `log_level` value
    // itself produces a clean fatal error instead of a filter-install panic.
    let config = Config::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!(
        host = %config.host,
        port = config.port,
        key_length = config.key_length,
        key_pool_size = config.key_pool_size,
        "starting uCaptcha server"
    );

    let bind_addr = format!("{}:{}", config.host, config.port);
    let rotation_interval = config.key_rotation_interval();

    let state = build_app_state(config)
        .await
        .map_err(|e| anyhow::anyhow!("startup failed: {e}"))?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let rotation_pool = state.key_pool.clone();
    let rotation_task = tokio::spawn(run_rotation_task(
        rotation_pool,
        rotation_interval,
        shutdown_rx,
    ));

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to listen for shutdown signal");
            }
        }
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {bind_addr}: {e}"))?;
    tracing::info!(address = %bind_addr, "listening");

    axum::serve(listener, app).await?;

    rotation_task.abort();
    Ok(())
}
