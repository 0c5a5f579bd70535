use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use anyhow::Context;
use stream_status::{probe, Config, StatusServer};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port_arg = std::env::args().nth(1);

    // When invoked as a Docker HEALTHCHECK, hit /health and exit immediately.
    // This avoids needing any external tool (curl/wget) in the container image.
    if port_arg.as_deref() == Some("--healthcheck") {
        return healthcheck().await;
    }

    // Load config; every setting has a default, so the file is optional
    let config_path = std::env::var("STREAM_STATUS_CONFIG").ok().map(PathBuf::from);
    let mut config = load_config(config_path.as_deref())?;

    // Initialise tracing
    let default_filter = format!(
        "stream_status={}",
        config.log_level.as_deref().unwrap_or("info")
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    if let Some(arg) = port_arg {
        if !config.server.override_port(&arg) {
            warn!(arg = %arg, port = config.server.port, "invalid port argument, using default");
        }
    }

    info!(
        port = config.server.port,
        mode = %config.monitor.mode,
        marker = %config.monitor.marker_path.display(),
        config = ?config_path,
        "stream-status starting"
    );

    let server = StatusServer::from_config(&config)
        .await
        .context("failed to start status server")?;
    let mut handle = server.start();

    info!(addr = %handle.local_addr(), "endpoints: GET /stream_started, GET /health");

    shutdown_signal().await;
    info!("shutdown signal received");
    handle.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Lightweight healthcheck: GET /health and exit 0 on 2xx, 1 otherwise.
/// Invoked via `stream-status --healthcheck` from Docker HEALTHCHECK.
///
/// Dials `STREAM_STATUS_PORT` if set, else the port from `STREAM_STATUS_CONFIG`.
async fn healthcheck() -> anyhow::Result<()> {
    let config_path = std::env::var("STREAM_STATUS_CONFIG").ok().map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;
    let port_env = std::env::var("STREAM_STATUS_PORT").ok();
    let port = probe::healthcheck_port(port_env.as_deref(), &config);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    if probe::check_health(addr).await? {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}
