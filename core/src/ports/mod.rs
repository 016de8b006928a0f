//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces that the application layer uses
//! to interact with external systems. Implementations live in `adapters`.

mod process;
mod registry;
mod sockets;

pub use process::ProcessReaderPort;
pub use registry::ContainerRegistryPort;
pub use sockets::SocketEnumeratorPort;
