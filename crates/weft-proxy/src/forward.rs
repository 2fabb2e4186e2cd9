//! Pass-through forwarding to the engine socket.
//!
//! Opens a new HTTP/1.1 connection to the engine per request. The create
//! path forwards a rewritten, buffered body; everything else streams
//! through untouched, with HTTP-upgrade bridging for attach and exec.

use crate::api::ProxyState;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use axum::body::Body;
use axum::extract::{OriginalUri, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode, Uri};
use bytes::Bytes;
use http_body_util::Full;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;

async fn engine_sender<B>(config: &ProxyConfig) -> Result<http1::SendRequest<B>>
where
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let stream = UnixStream::connect(&config.engine_socket)
        .await
        .map_err(|e| ProxyError::Upstream(format!("connect to engine socket: {e}")))?;

    let (sender, conn) = http1::Builder::new()
        .handshake(TokioIo::new(stream))
        .await
        .map_err(|e| ProxyError::Upstream(format!("engine handshake failed: {e}")))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            let msg = e.to_string().to_lowercase();
            if !msg.contains("canceled") && !msg.contains("incomplete") {
                tracing::debug!("engine connection ended: {}", e);
            }
        }
    });

    Ok(sender)
}

/// Forwards a buffered request body to the engine.
///
/// Used by the create path after the body has been rewritten; the declared
/// content length is replaced so it matches the new body.
///
/// # Errors
///
/// Returns an error if the engine connection, handshake, or request fails.
pub async fn forward_buffered(
    config: &ProxyConfig,
    method: Method,
    path_and_query: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response<Body>> {
    let mut sender = engine_sender::<Full<Bytes>>(config).await?;

    let content_length = body.len() as u64;
    let mut req = hyper::Request::builder()
        .method(method)
        .uri(path_and_query)
        .body(Full::new(body))
        .map_err(|e| ProxyError::Upstream(format!("failed to build engine request: {e}")))?;

    if let Some(ct) = headers.get(header::CONTENT_TYPE) {
        req.headers_mut().insert(header::CONTENT_TYPE, ct.clone());
    }
    req.headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    req.headers_mut()
        .insert(header::HOST, HeaderValue::from_static("localhost"));
    req.headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));

    let response = sender
        .send_request(req)
        .await
        .map_err(|e| ProxyError::Upstream(format!("engine request failed: {e}")))?;

    let (parts, incoming) = response.into_parts();
    Ok(Response::from_parts(parts, Body::new(incoming)))
}

/// Forwards a request to the engine without buffering its body.
///
/// # Errors
///
/// Returns an error if the engine connection, handshake, or request fails.
pub async fn forward_stream(
    config: &ProxyConfig,
    original_uri: &Uri,
    req: Request,
) -> Result<Response<Body>> {
    let mut sender = engine_sender::<Body>(config).await?;

    let path_and_query = original_uri
        .path_and_query()
        .map_or("/", hyper::http::uri::PathAndQuery::as_str);
    let method = req.method().clone();
    let content_type = req.headers().get(header::CONTENT_TYPE).cloned();
    let body = req.into_body();

    let mut engine_req = hyper::Request::builder()
        .method(method)
        .uri(path_and_query)
        .body(body)
        .map_err(|e| ProxyError::Upstream(format!("failed to build engine request: {e}")))?;

    if let Some(ct) = content_type {
        engine_req.headers_mut().insert(header::CONTENT_TYPE, ct);
    }
    engine_req
        .headers_mut()
        .insert(header::HOST, HeaderValue::from_static("localhost"));
    engine_req
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));

    let response = sender
        .send_request(engine_req)
        .await
        .map_err(|e| ProxyError::Upstream(format!("engine request failed: {e}")))?;

    let (parts, incoming) = response.into_parts();
    Ok(Response::from_parts(parts, Body::new(incoming)))
}

/// Forwards a request with HTTP-upgrade support (attach, exec).
///
/// After a 101 from the engine, the client and engine streams are bridged
/// with `copy_bidirectional` in the background.
///
/// # Errors
///
/// Returns an error if the engine connection, handshake, request, or
/// response construction fails.
pub async fn forward_with_upgrade(
    config: &ProxyConfig,
    mut client_req: Request,
    original_uri: &Uri,
) -> Result<Response<Body>> {
    let mut sender = engine_sender::<Body>(config).await?;

    let path_and_query = original_uri
        .path_and_query()
        .map_or("/", hyper::http::uri::PathAndQuery::as_str);
    let req_body = std::mem::take(client_req.body_mut());

    let mut engine_req = hyper::Request::builder()
        .method(client_req.method())
        .uri(path_and_query)
        .body(req_body)
        .map_err(|e| ProxyError::Upstream(format!("failed to build engine request: {e}")))?;

    // Forward all headers except Host.
    for (key, value) in client_req.headers() {
        if key != header::HOST {
            engine_req.headers_mut().insert(key.clone(), value.clone());
        }
    }
    engine_req
        .headers_mut()
        .insert(header::HOST, HeaderValue::from_static("localhost"));

    let engine_response = sender
        .send_request(engine_req)
        .await
        .map_err(|e| ProxyError::Upstream(format!("engine request failed: {e}")))?;

    if engine_response.status() != StatusCode::SWITCHING_PROTOCOLS {
        let (parts, incoming) = engine_response.into_parts();
        return Ok(Response::from_parts(parts, Body::new(incoming)));
    }

    // Raw-stream vs multiplexed-stream content type from the engine's 101.
    let content_type = engine_response.headers().get(header::CONTENT_TYPE).cloned();

    // Both upgrade futures must be prepared before the 101 goes back.
    let client_upgrade = hyper::upgrade::on(&mut client_req);
    let engine_upgrade = hyper::upgrade::on(engine_response);

    let mut builder = Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::CONNECTION, "Upgrade")
        .header(header::UPGRADE, "tcp");

    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }

    let response = builder
        .body(Body::empty())
        .map_err(|e| ProxyError::Upstream(format!("failed to build upgrade response: {e}")))?;

    tokio::spawn(async move {
        let (client_io, engine_io) = match tokio::try_join!(client_upgrade, engine_upgrade) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::debug!("upgrade bridging setup failed: {}", e);
                return;
            }
        };
        let mut client_io = TokioIo::new(client_io);
        let mut engine_io = TokioIo::new(engine_io);
        if let Err(e) = tokio::io::copy_bidirectional(&mut client_io, &mut engine_io).await {
            let msg = e.to_string().to_lowercase();
            if !msg.contains("broken pipe") && !msg.contains("connection reset") {
                tracing::debug!("upgrade bridge error: {}", e);
            }
        }
    });

    Ok(response)
}

/// Catch-all handler that proxies unmatched requests to the engine.
///
/// The response path is a pass-through no-op, so anything the proxy does
/// not rewrite behaves exactly as if the client talked to the engine
/// directly.
///
/// # Errors
///
/// Returns an error if forwarding fails.
pub async fn proxy_fallback(
    State(state): State<ProxyState>,
    OriginalUri(uri): OriginalUri,
    req: Request,
) -> Result<Response<Body>> {
    let wants_upgrade = req.headers().get(header::UPGRADE).is_some()
        || req
            .headers()
            .get(header::CONNECTION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("upgrade"));

    if wants_upgrade {
        return forward_with_upgrade(&state.config, req, &uri).await;
    }

    forward_stream(&state.config, &uri, req).await
}
