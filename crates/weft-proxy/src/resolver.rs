//! Overlay address resolution.
//!
//! Whether a container joins the overlay network, and with which CIDRs, is
//! decided outside the interceptor. The interceptor only sees the trait:
//! `Ok` (possibly with zero addresses, meaning "join the default network")
//! triggers the rewrite, `Err` means the container opted out and the
//! request passes through untouched.

use serde_json::Value;
use thiserror::Error;
use weft_constants::engine::CIDR_ENV_KEY;
use weft_docker::{ContainerConfig, HostConfig};

/// Reason a container is not joining the overlay network.
///
/// This is not a failure: the caller logs it and forwards the request
/// unmodified.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct NetworkOptOut(pub String);

/// Decides the overlay addresses for a container being created.
pub trait AddressResolver: Send + Sync {
    /// Resolves the CIDRs to assign, or the reason none apply.
    fn resolve(
        &self,
        config: &ContainerConfig,
        host_config: Option<&HostConfig>,
    ) -> std::result::Result<Vec<String>, NetworkOptOut>;
}

/// Resolver driven by the container's own environment.
///
/// Containers request addresses with a `WEFT_CIDR` env entry; the value
/// `none` opts out explicitly, as does host network mode.
pub struct EnvAddressResolver {
    /// Attach containers that carry no `WEFT_CIDR` entry at all.
    pub attach_by_default: bool,
}

impl AddressResolver for EnvAddressResolver {
    fn resolve(
        &self,
        config: &ContainerConfig,
        host_config: Option<&HostConfig>,
    ) -> std::result::Result<Vec<String>, NetworkOptOut> {
        if let Some(host) = host_config {
            if host.extra.get("NetworkMode").and_then(Value::as_str) == Some("host") {
                return Err(NetworkOptOut("host network mode".to_string()));
            }
        }

        let cidr_entry = config
            .extra
            .get("Env")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .find_map(|entry| entry.strip_prefix(CIDR_ENV_KEY));

        match cidr_entry {
            Some("none") => Err(NetworkOptOut("WEFT_CIDR=none".to_string())),
            Some(value) => Ok(value.split_whitespace().map(String::from).collect()),
            None if self.attach_by_default => Ok(vec![]),
            None => Err(NetworkOptOut("no WEFT_CIDR entry".to_string())),
        }
    }
}
