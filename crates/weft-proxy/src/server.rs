//! Proxy server.

use crate::api::{create_router, ProxyState};
use crate::error::{ProxyError, Result};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use std::path::{Path, PathBuf};
use tokio::net::UnixListener;
use tower::Service;

/// Proxy server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Unix socket path clients connect to.
    pub socket_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/weft.sock"),
        }
    }
}

/// The proxy server: accepts client connections on a Unix socket and
/// serves the intercepting router over HTTP/1.1 with upgrade support.
pub struct ProxyServer {
    config: ServerConfig,
    state: ProxyState,
}

impl ProxyServer {
    /// Creates a new proxy server.
    #[must_use]
    pub fn new(config: ServerConfig, state: ProxyState) -> Self {
        Self { config, state }
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Runs the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound or accepting fails.
    pub async fn run(&self) -> Result<()> {
        // Remove a stale socket from a previous run.
        let _ = std::fs::remove_file(&self.config.socket_path);

        if let Some(parent) = self.config.socket_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let listener = UnixListener::bind(&self.config.socket_path)
            .map_err(|e| ProxyError::Server(e.to_string()))?;

        tracing::info!(
            "weft proxy listening on {}",
            self.config.socket_path.display()
        );

        let app = create_router(self.state.clone());

        loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| ProxyError::Server(e.to_string()))?;

            let tower_service = app.clone();
            tokio::spawn(async move {
                let hyper_service =
                    hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
                        tower_service.clone().call(request)
                    });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), hyper_service)
                    .with_upgrades()
                    .await
                {
                    if !is_disconnect_error(&err.to_string()) {
                        tracing::error!("error serving connection: {}", err);
                    }
                }
            });
        }
    }
}

fn is_disconnect_error(err: &str) -> bool {
    let msg = err.to_lowercase();
    msg.contains("shutting down")
        || msg.contains("broken pipe")
        || msg.contains("connection reset")
        || msg.contains("connection aborted")
        || msg.contains("unexpected eof")
}
