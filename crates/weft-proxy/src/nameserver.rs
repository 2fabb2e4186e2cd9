//! Sibling name-service domain lookup.
//!
//! Container creation must never block on DNS, so every failure in this
//! path yields the compile-time default domain and "not running" instead
//! of an error.

use weft_constants::dns::{DEFAULT_LOCAL_DOMAIN, DNS_CONTAINER_NAME};
use weft_docker::ContainerEngine;

/// Fetches the current DNS domain from the name-service container.
///
/// Returns `(domain, running)`. `running` is true only when the container
/// was inspected successfully, had an address, and answered the domain
/// request with a success status.
pub async fn dns_domain(
    engine: &dyn ContainerEngine,
    http: &reqwest::Client,
    http_port: u16,
) -> (String, bool) {
    let fallback = || (DEFAULT_LOCAL_DOMAIN.to_string(), false);

    let container = match engine.inspect_container(DNS_CONTAINER_NAME).await {
        Ok(container) => container,
        Err(e) => {
            tracing::debug!("name service inspection failed: {}", e);
            return fallback();
        }
    };

    let address = match container.network_settings {
        Some(settings) if !settings.ip_address.is_empty() => settings.ip_address,
        _ => return fallback(),
    };

    let url = format!("http://{address}:{http_port}/domain");
    let response = match http.get(&url).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            tracing::debug!(status = %response.status(), "name service refused domain request");
            return fallback();
        }
        Err(e) => {
            tracing::debug!("name service request failed: {}", e);
            return fallback();
        }
    };

    match response.text().await {
        Ok(domain) => (domain, true),
        Err(_) => fallback(),
    }
}
