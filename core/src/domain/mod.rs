//! Domain layer - Pure data models and report logic.
//!
//! This module contains the entities of a port audit. These types have no
//! I/O dependencies and can be tested in isolation.

mod container;
mod entry;
mod process;
mod report;
mod snapshot;
mod socket;

// Re-export all domain types
pub use container::{
    link_proxies, ContainerDescriptor, ContainerPortMapping, NetworkMode, ProxyArgs,
    RegistryState, DOCKER_PROXY,
};
pub use entry::{Owner, OwnerKey, PortEntry};
pub use process::{container_id_from_cgroups, ProcessInfo, ProcessLookup, UNKNOWN_PROCESS};
pub use report::Report;
pub use snapshot::HostSnapshot;
pub use socket::{ListeningSocket, Protocol, Transport};
