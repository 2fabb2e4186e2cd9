//! # weft-docker
//!
//! Docker Engine API wire types and a minimal engine client for weft.
//!
//! The types here model only the fields the proxy inspects or mutates.
//! Everything else in a request body is captured in raw form and written
//! back untouched, so a rewritten create request is byte-equivalent to the
//! original for every field the proxy does not own.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ContainerEngine, UnixEngineClient};
pub use error::{EngineError, Result};
pub use types::{
    ContainerConfig, ContainerCreateBody, ContainerInspect, HostConfig, ImageConfig, ImageInspect,
    NetworkSettings,
};
