use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weft_docker::UnixEngineClient;
use weft_proxy::{EnvAddressResolver, ProxyConfig, ProxyServer, ProxyState, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "weftd")]
#[command(author, version, about, long_about = None)]
pub struct DaemonArgs {
    /// Unix socket path clients connect to (default: /var/run/weft.sock).
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Docker engine socket requests are forwarded to.
    #[arg(long)]
    pub engine_socket: Option<PathBuf>,

    /// Disable DNS integration entirely.
    #[arg(long)]
    pub without_dns: bool,

    /// Configure DNS even when the name service is not running.
    #[arg(long)]
    pub with_dns: bool,

    /// Host directory holding the wait binary.
    #[arg(long)]
    pub wait_volume_source: Option<String>,

    /// Bridge address appended to container DNS servers.
    #[arg(long)]
    pub docker_bridge_ip: Option<String>,

    /// HTTP control port of the sibling name service.
    #[arg(long)]
    pub dns_http_port: Option<u16>,

    /// Timeout for the name-service domain fetch, in milliseconds.
    #[arg(long)]
    pub dns_http_timeout_ms: Option<u64>,

    /// Attach containers that carry no WEFT_CIDR environment entry.
    #[arg(long)]
    pub attach_all: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weft=info,weftd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    run(DaemonArgs::parse()).await
}

async fn run(args: DaemonArgs) -> Result<()> {
    info!("Starting weft proxy daemon...");

    let mut config = ProxyConfig::default();
    if let Some(engine_socket) = args.engine_socket {
        config.engine_socket = engine_socket;
    }
    config.without_dns = args.without_dns;
    config.with_dns = args.with_dns;
    if let Some(source) = args.wait_volume_source {
        config.wait_volume_source = source;
    }
    if let Some(bridge_ip) = args.docker_bridge_ip {
        config.docker_bridge_ip = bridge_ip;
    }
    if let Some(port) = args.dns_http_port {
        config.dns_http_port = port;
    }
    if let Some(timeout_ms) = args.dns_http_timeout_ms {
        config.dns_http_timeout = Duration::from_millis(timeout_ms);
    }

    let engine = Arc::new(UnixEngineClient::new(config.engine_socket.clone()));
    let resolver = Arc::new(EnvAddressResolver {
        attach_by_default: args.attach_all,
    });

    let server_config = args
        .socket
        .map(|socket_path| ServerConfig { socket_path })
        .unwrap_or_default();
    let socket_path = server_config.socket_path.clone();

    info!(
        socket = %socket_path.display(),
        engine_socket = %config.engine_socket.display(),
        without_dns = config.without_dns,
        with_dns = config.with_dns,
        "Proxy configured"
    );

    let state = ProxyState::new(config, engine, resolver).context("Failed to build proxy state")?;
    let server = ProxyServer::new(server_config, state);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("Proxy server error: {}", e);
        }
    });

    shutdown_signal().await;
    info!("Shutdown signal received");

    server_handle.abort();

    if let Err(e) = std::fs::remove_file(&socket_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove socket {}: {}", socket_path.display(), e);
        }
    }

    info!("weft proxy daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
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
