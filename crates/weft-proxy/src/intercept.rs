//! Create-container request rewriting.
//!
//! The pipeline runs strictly top to bottom per request: decode, resolve
//! overlay eligibility, inject the wait volume, wrap the entrypoint,
//! configure DNS, re-encode. Nothing is shared across requests.

use crate::api::ProxyState;
use crate::error::{ProxyError, Result};
use crate::nameserver;
use bytes::Bytes;
use weft_constants::dns::MAX_DOCKER_HOSTNAME;
use weft_constants::wait::{WAIT_ENTRYPOINT, WAIT_MOUNT_POINT};
use weft_docker::{ContainerConfig, ContainerCreateBody, ContainerEngine, EngineError, HostConfig};

/// Rewrites a create-container body for overlay network participation.
///
/// `name` is the create request's `name` query parameter. When the
/// resolver reports the container opted out, the body is re-encoded
/// unmodified; nothing else in the request changes.
///
/// # Errors
///
/// Fails on a malformed body, a missing image, an engine inspection
/// failure, or a container with no command to wrap.
pub async fn rewrite_create_request(
    state: &ProxyState,
    name: Option<&str>,
    body: &[u8],
) -> Result<Bytes> {
    let mut create: ContainerCreateBody = serde_json::from_slice(body)?;

    match state.resolver.resolve(&create.config, create.host_config.as_ref()) {
        Err(reason) => {
            tracing::info!("ignoring container: {}", reason);
        }
        Ok(cidrs) => {
            tracing::info!(cidrs = %cidrs.join(" "), "creating container on overlay network");
            let host = create.host_config.get_or_insert_with(HostConfig::default);
            inject_wait_volume(host, &state.config.wait_volume_source);
            set_wait_entrypoint(state.engine.as_ref(), &mut create.config).await?;
            configure_dns(state, &mut create, name).await;
        }
    }

    Ok(Bytes::from(serde_json::to_vec(&create)?))
}

/// Ensures exactly one wait-volume bind exists.
///
/// Any existing bind targeting the wait mount point is dropped regardless
/// of its source or mode, then a single read-only bind is appended, so the
/// operation is idempotent. Order of the remaining binds is preserved.
pub fn inject_wait_volume(host: &mut HostConfig, volume_source: &str) {
    let mut binds: Vec<String> = host
        .binds
        .take()
        .unwrap_or_default()
        .into_iter()
        .filter(|bind| {
            let parts: Vec<&str> = bind.split(':').collect();
            !(parts.len() >= 2 && parts[1] == WAIT_MOUNT_POINT)
        })
        .collect();
    binds.push(format!("{volume_source}:{WAIT_MOUNT_POINT}:ro"));
    host.binds = Some(binds);
}

fn is_empty(seq: &Option<Vec<String>>) -> bool {
    seq.as_ref().map_or(true, Vec::is_empty)
}

/// Prefixes the container's effective command with the wait wrapper.
///
/// An empty entrypoint is resolved from image metadata first; an
/// entrypoint that is absent (as opposed to present but empty) also adopts
/// the image's default entrypoint. The "already wrapped" check compares
/// only the first element, so a wrapper that was installed with extra
/// arguments still counts as wrapped.
pub async fn set_wait_entrypoint(
    engine: &dyn ContainerEngine,
    config: &mut ContainerConfig,
) -> Result<()> {
    if is_empty(&config.entrypoint) {
        let image_ref = config.image.clone().unwrap_or_default();
        let image = match engine.inspect_image(&image_ref).await {
            Ok(image) => image,
            Err(EngineError::ImageNotFound(_)) => {
                return Err(ProxyError::NoSuchImage(image_ref));
            }
            Err(e) => return Err(ProxyError::Engine(e)),
        };
        let image_config = image.config.unwrap_or_default();

        if is_empty(&config.cmd) {
            config.cmd = image_config.cmd;
        }

        if config.entrypoint.is_none() {
            config.entrypoint = image_config.entrypoint;
        }
    }

    if is_empty(&config.entrypoint) && is_empty(&config.cmd) {
        return Err(ProxyError::NoCommandSpecified);
    }

    let already_wrapped = config
        .entrypoint
        .as_ref()
        .and_then(|ep| ep.first())
        .is_some_and(|first| first.as_str() == WAIT_ENTRYPOINT[0]);
    if !already_wrapped {
        let mut entrypoint: Vec<String> = WAIT_ENTRYPOINT.iter().map(|s| (*s).to_string()).collect();
        entrypoint.extend(config.entrypoint.take().unwrap_or_default());
        config.entrypoint = Some(entrypoint);
    }

    Ok(())
}

fn hostname_unset(config: &ContainerConfig) -> bool {
    config.hostname.as_deref().map_or(true, str::is_empty)
}

/// Applies hostname, domain and DNS-search defaults.
///
/// Best-effort: a name service that cannot be reached selects the
/// fallback domain, and nothing here ever fails the request.
async fn configure_dns(state: &ProxyState, create: &mut ContainerCreateBody, name: Option<&str>) {
    if state.config.without_dns {
        return;
    }

    let (dns_domain, dns_running) = nameserver::dns_domain(
        state.engine.as_ref(),
        &state.http,
        state.config.dns_http_port,
    )
    .await;
    if !(dns_running || state.config.with_dns) {
        return;
    }

    let Some(host) = create.host_config.as_mut() else {
        return;
    };
    host.dns
        .get_or_insert_with(Vec::new)
        .push(state.config.docker_bridge_ip.clone());

    if hostname_unset(&create.config) {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            // A trailing period is unusual on the end of a host name.
            let trimmed = dns_domain.strip_suffix('.').unwrap_or(&dns_domain);
            if name.len() + 1 + trimmed.len() > MAX_DOCKER_HOSTNAME {
                tracing::warn!(name, "container name too long to be used as hostname");
            } else {
                create.config.hostname = Some(name.to_string());
                create.config.domainname = Some(trimmed.to_string());
            }
        }
    }

    if host.dns_search.as_ref().map_or(true, Vec::is_empty) {
        host.dns_search = Some(if hostname_unset(&create.config) {
            vec![dns_domain]
        } else {
            // Hostname and domain are fully qualified, no search suffix.
            vec![".".to_string()]
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_binds(binds: &[&str]) -> HostConfig {
        HostConfig {
            binds: Some(binds.iter().map(|b| (*b).to_string()).collect()),
            ..HostConfig::default()
        }
    }

    #[test]
    fn wait_volume_appended_last() {
        let mut host = host_with_binds(&["/data:/data:rw"]);
        inject_wait_volume(&mut host, "/usr/lib/weft");
        assert_eq!(
            host.binds.unwrap(),
            vec!["/data:/data:rw", "/usr/lib/weft:/w:ro"]
        );
    }

    #[test]
    fn wait_volume_injection_is_idempotent() {
        let mut host = HostConfig::default();
        inject_wait_volume(&mut host, "/usr/lib/weft");
        inject_wait_volume(&mut host, "/usr/lib/weft");
        assert_eq!(host.binds.unwrap(), vec!["/usr/lib/weft:/w:ro"]);
    }

    #[test]
    fn stale_wait_binds_are_dropped_regardless_of_source_or_mode() {
        let mut host = host_with_binds(&["/old:/w:rw", "/data:/data", "/other:/w"]);
        inject_wait_volume(&mut host, "/usr/lib/weft");
        assert_eq!(
            host.binds.unwrap(),
            vec!["/data:/data", "/usr/lib/weft:/w:ro"]
        );
    }

    #[test]
    fn bind_without_target_is_kept() {
        let mut host = host_with_binds(&["anonymousvolume"]);
        inject_wait_volume(&mut host, "/usr/lib/weft");
        assert_eq!(
            host.binds.unwrap(),
            vec!["anonymousvolume", "/usr/lib/weft:/w:ro"]
        );
    }

    #[test]
    fn empty_and_absent_sequences_both_count_as_empty() {
        assert!(is_empty(&None));
        assert!(is_empty(&Some(vec![])));
        assert!(!is_empty(&Some(vec!["x".to_string()])));
    }
}
