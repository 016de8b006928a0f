//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with external systems.

pub mod docker;
pub mod process;
pub mod sockets;

// Re-export main types for convenience
pub use docker::{DockerRegistry, DEFAULT_DOCKER_TIMEOUT};
pub use process::ProcfsProcessReader;
pub use sockets::{ProcfsEnumerator, SocketEnumerator, SocketSource, SsEnumerator};
