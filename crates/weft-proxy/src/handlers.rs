//! Intercepted endpoint handlers.

use crate::api::ProxyState;
use crate::error::Result;
use crate::{forward, intercept};
use axum::body::Body;
use axum::extract::{OriginalUri, Query, State};
use axum::http::{HeaderMap, Method, Response};
use bytes::Bytes;
use serde::Deserialize;

/// Create container query parameters.
#[derive(Debug, Deserialize)]
pub struct CreateContainerQuery {
    /// Container name.
    pub name: Option<String>,
}

/// Intercepts `POST /containers/create`.
///
/// The body is rewritten for overlay participation and forwarded to the
/// engine with a matching content length; the engine's response is
/// returned unchanged.
pub async fn create_container(
    State(state): State<ProxyState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<CreateContainerQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response<Body>> {
    let rewritten =
        intercept::rewrite_create_request(&state, params.name.as_deref(), &body).await?;

    let path_and_query = uri
        .path_and_query()
        .map_or("/containers/create", hyper::http::uri::PathAndQuery::as_str);

    forward::forward_buffered(&state.config, Method::POST, path_and_query, &headers, rewritten)
        .await
}
