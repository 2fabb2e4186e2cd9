/// Default Docker engine socket the proxy forwards to.
pub const DEFAULT_ENGINE_SOCKET: &str = "/var/run/docker.sock";

/// Default address of the docker bridge, used as in-container DNS server.
pub const DEFAULT_BRIDGE_IP: &str = "172.17.0.1";

/// Environment variable a container sets to request overlay addresses.
pub const CIDR_ENV_KEY: &str = "WEFT_CIDR=";
