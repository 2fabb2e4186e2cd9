/// Name of the sibling name-resolution container.
pub const DNS_CONTAINER_NAME: &str = "weftdns";

/// HTTP control port the name service listens on.
pub const DNS_HTTP_PORT: u16 = 6784;

/// Domain used when the name service cannot be reached.
pub const DEFAULT_LOCAL_DOMAIN: &str = "weft.local.";

/// Docker rejects hostname + domain longer than this.
pub const MAX_DOCKER_HOSTNAME: usize = 64;
