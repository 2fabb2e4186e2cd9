//! Proxy configuration.

use std::path::PathBuf;
use std::time::Duration;
use weft_constants::dns::DNS_HTTP_PORT;
use weft_constants::engine::{DEFAULT_BRIDGE_IP, DEFAULT_ENGINE_SOCKET};
use weft_constants::wait::DEFAULT_WAIT_VOLUME_SOURCE;

/// Configuration surface consumed by the interceptor and forwarder.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Engine socket requests are forwarded to.
    pub engine_socket: PathBuf,

    /// Disable DNS integration entirely.
    pub without_dns: bool,

    /// Configure DNS even when the name service is not running.
    pub with_dns: bool,

    /// Host directory mounted read-only at the wait mount point.
    pub wait_volume_source: String,

    /// Bridge address appended to container DNS servers.
    pub docker_bridge_ip: String,

    /// HTTP control port of the sibling name service.
    pub dns_http_port: u16,

    /// Timeout for the name-service domain fetch.
    pub dns_http_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            engine_socket: PathBuf::from(DEFAULT_ENGINE_SOCKET),
            without_dns: false,
            with_dns: false,
            wait_volume_source: DEFAULT_WAIT_VOLUME_SOURCE.to_string(),
            docker_bridge_ip: DEFAULT_BRIDGE_IP.to_string(),
            dns_http_port: DNS_HTTP_PORT,
            dns_http_timeout: Duration::from_secs(3),
        }
    }
}
