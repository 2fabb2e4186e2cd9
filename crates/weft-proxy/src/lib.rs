//! # weft-proxy
//!
//! A request-rewriting proxy that sits between Docker clients and the
//! engine socket. `POST /containers/create` requests are inspected and,
//! when the container should join the overlay network, rewritten in place:
//!
//! - the network-readiness support volume is bind-mounted read-only at `/w`
//! - the effective entrypoint is prefixed with the wait wrapper
//! - hostname, domain and DNS search defaults are sourced from the sibling
//!   name-service container
//!
//! Every other endpoint is forwarded to the engine untouched, including
//! HTTP-upgrade streams for attach and exec, so the proxy socket is a
//! drop-in replacement for the engine socket.
//!
//! ## Architecture
//!
//! ```text
//! docker CLI ──► Unix socket ──► weft-proxy ──► /var/run/docker.sock
//!                                    │
//!                                    ├─► image/container inspect (engine)
//!                                    └─► http://weftdns:6784/domain
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod forward;
pub mod handlers;
pub mod intercept;
pub mod nameserver;
pub mod resolver;
pub mod server;
pub mod trace;

pub use api::{create_router, ProxyState};
pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
pub use resolver::{AddressResolver, EnvAddressResolver, NetworkOptOut};
pub use server::{ProxyServer, ServerConfig};
