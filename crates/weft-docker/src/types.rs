//! Docker API types.
//!
//! Shapes follow the Docker Engine API create/inspect payloads, but only
//! the fields the proxy touches are modeled. Every other field is held in
//! a `#[serde(flatten)]` raw map and re-encoded verbatim, including its
//! presence or absence. `Entrypoint` and `Cmd` are `Option<Vec<String>>`
//! because "absent" and "present but empty" are distinct on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a `POST /containers/create` request.
///
/// The container config fields sit at the top level of the JSON object;
/// `HostConfig` and `MacAddress` are siblings of them.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ContainerCreateBody {
    /// Container configuration (flattened into the top-level object).
    #[serde(flatten)]
    pub config: ContainerConfig,

    /// Host configuration.
    #[serde(rename = "HostConfig", skip_serializing_if = "Option::is_none")]
    pub host_config: Option<HostConfig>,

    /// MAC address, preserved verbatim.
    #[serde(rename = "MacAddress", skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// Container configuration fields the proxy reads or writes.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Hostname.
    #[serde(rename = "Hostname", skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Domain name.
    #[serde(rename = "Domainname", skip_serializing_if = "Option::is_none")]
    pub domainname: Option<String>,

    /// Image reference.
    #[serde(rename = "Image", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Entrypoint.
    #[serde(rename = "Entrypoint", skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,

    /// Command.
    #[serde(rename = "Cmd", skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,

    /// Everything else (Env, Labels, ExposedPorts, ...), untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Host configuration fields the proxy reads or writes.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Volume binds, `source:target[:mode]`.
    #[serde(rename = "Binds", skip_serializing_if = "Option::is_none")]
    pub binds: Option<Vec<String>>,

    /// DNS server addresses.
    #[serde(rename = "Dns", skip_serializing_if = "Option::is_none")]
    pub dns: Option<Vec<String>>,

    /// DNS search domains.
    #[serde(rename = "DnsSearch", skip_serializing_if = "Option::is_none")]
    pub dns_search: Option<Vec<String>>,

    /// Everything else (PortBindings, NetworkMode, ...), untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Image inspect response.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ImageInspect {
    /// Image configuration.
    #[serde(rename = "Config", skip_serializing_if = "Option::is_none")]
    pub config: Option<ImageConfig>,
}

/// Image-level defaults for created containers.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Default command.
    #[serde(rename = "Cmd", skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,

    /// Default entrypoint.
    #[serde(rename = "Entrypoint", skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
}

/// Container inspect response (networking subset).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ContainerInspect {
    /// Network settings.
    #[serde(rename = "NetworkSettings", skip_serializing_if = "Option::is_none")]
    pub network_settings: Option<NetworkSettings>,
}

/// Network settings of a running container.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Assigned IP address, empty when the container has none.
    #[serde(rename = "IPAddress", default)]
    pub ip_address: String,

    /// Remaining settings, unread.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
