//! Container engine client.
//!
//! The proxy only ever asks the engine two questions: what an image's
//! default command and entrypoint are, and what address a container has.
//! Both are modeled on a trait so the interceptor can be exercised without
//! a running engine.

use crate::error::{EngineError, Result};
use crate::types::{ContainerInspect, ImageInspect};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper::http::{header, HeaderValue, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;

/// Read-only queries the proxy needs from the container engine.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Inspects an image by reference.
    async fn inspect_image(&self, reference: &str) -> Result<ImageInspect>;

    /// Inspects a container by name or ID.
    async fn inspect_container(&self, name: &str) -> Result<ContainerInspect>;
}

/// Engine client over the local Docker Unix socket.
///
/// Opens a fresh HTTP/1.1 connection per request; the two inspect calls
/// are rare enough that connection reuse buys nothing.
pub struct UnixEngineClient {
    socket_path: PathBuf,
}

impl UnixEngineClient {
    /// Creates a client for the given engine socket.
    #[must_use]
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Returns the engine socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, Bytes)> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| EngineError::Connection(format!("connect to engine socket: {e}")))?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = http1::Builder::new()
            .handshake(io)
            .await
            .map_err(|e| EngineError::Connection(format!("engine handshake failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("engine connection ended: {}", e);
            }
        });

        let req = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(header::HOST, HeaderValue::from_static("localhost"))
            .header(header::CONNECTION, HeaderValue::from_static("close"))
            .body(Full::new(Bytes::new()))
            .map_err(|e| EngineError::Connection(format!("failed to build request: {e}")))?;

        let response = sender
            .send_request(req)
            .await
            .map_err(|e| EngineError::Connection(format!("engine request failed: {e}")))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| EngineError::Connection(format!("engine body read failed: {e}")))?
            .to_bytes();

        Ok((status, body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (status, body) = self.get(path).await?;
        if !status.is_success() {
            return Err(EngineError::Api {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ContainerEngine for UnixEngineClient {
    async fn inspect_image(&self, reference: &str) -> Result<ImageInspect> {
        let path = format!("/images/{reference}/json");
        match self.get_json(&path).await {
            Err(EngineError::Api { status: 404, .. }) => {
                Err(EngineError::ImageNotFound(reference.to_string()))
            }
            other => other,
        }
    }

    async fn inspect_container(&self, name: &str) -> Result<ContainerInspect> {
        let path = format!("/containers/{name}/json");
        match self.get_json(&path).await {
            Err(EngineError::Api { status: 404, .. }) => {
                Err(EngineError::ContainerNotFound(name.to_string()))
            }
            other => other,
        }
    }
}
