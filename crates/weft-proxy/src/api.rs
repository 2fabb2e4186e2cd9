//! Proxy router.
//!
//! Only `POST /containers/create` is intercepted; every other endpoint,
//! on any API version prefix, falls through to the pass-through forwarder.

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::resolver::AddressResolver;
use crate::{forward, handlers, trace};
use axum::routing::post;
use axum::{middleware, Router};
use std::sync::Arc;
use weft_docker::ContainerEngine;

/// Docker API versions the create route is registered under.
const API_VERSIONS: &[&str] = &[
    "1.24", "1.25", "1.26", "1.27", "1.28", "1.29", "1.30", "1.31", "1.32", "1.33", "1.34",
    "1.35", "1.36", "1.37", "1.38", "1.39", "1.40", "1.41", "1.42", "1.43",
];

/// State shared with handlers.
#[derive(Clone)]
pub struct ProxyState {
    /// Proxy configuration.
    pub config: Arc<ProxyConfig>,
    /// Container engine used for image and container inspection.
    pub engine: Arc<dyn ContainerEngine>,
    /// Overlay address resolver.
    pub resolver: Arc<dyn AddressResolver>,
    /// HTTP client for the name-service domain fetch.
    pub http: reqwest::Client,
}

impl ProxyState {
    /// Builds the shared state, including the name-service HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        config: ProxyConfig,
        engine: Arc<dyn ContainerEngine>,
        resolver: Arc<dyn AddressResolver>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.dns_http_timeout)
            .build()
            .map_err(|e| ProxyError::Server(format!("failed to build http client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            engine,
            resolver,
            http,
        })
    }
}

/// Creates the proxy router.
#[must_use]
pub fn create_router(state: ProxyState) -> Router {
    let mut router = Router::new().route("/containers/create", post(handlers::create_container));

    for version in API_VERSIONS {
        router = router.nest(&format!("/v{version}"), versioned_router());
    }

    router
        .fallback(forward::proxy_fallback)
        .layer(middleware::from_fn(trace::trace_id_middleware))
        .with_state(state)
}

/// Intercepted endpoints under a version prefix.
fn versioned_router() -> Router<ProxyState> {
    Router::new().route("/containers/create", post(handlers::create_container))
}
