/// Mount point of the network-readiness support volume inside containers.
pub const WAIT_MOUNT_POINT: &str = "/w";

/// Entrypoint prefix that delays the container command until overlay
/// network setup completes. The binary lives on the support volume.
pub const WAIT_ENTRYPOINT: &[&str] = &["/w/w"];

/// Default host directory holding the wait binary.
pub const DEFAULT_WAIT_VOLUME_SOURCE: &str = "/usr/lib/weft";
