//! PortScope Core Library
//!
//! Audits the listening sockets of a Linux host and explains each one:
//! - Enumerate listening TCP and UDP sockets (`ss`, or `/proc/net`)
//! - Resolve the owning process of every socket
//! - Query Docker for published ports and link `docker-proxy` processes
//! - Correlate and merge everything into one report per port and owner
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models and report rendering
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: The audit pipeline
//!
//! # Platform Support
//! - Linux only: sockets and processes are read from `ss` and procfs.

pub mod adapters;
pub mod application;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export domain types (primary API)
pub use domain::{
    ContainerDescriptor, ContainerPortMapping, HostSnapshot, ListeningSocket, NetworkMode, Owner,
    PortEntry, ProcessInfo, ProcessLookup, Protocol, RegistryState, Report, Transport,
};

// Re-export other commonly used types
pub use adapters::{DockerRegistry, ProcfsProcessReader, SocketEnumerator, SocketSource};
pub use application::{build_report, AuditService};
pub use error::{Error, RegistryError, Result};

/// Audit service wired to the host's real adapters.
pub type HostAuditService = AuditService<SocketEnumerator, DockerRegistry, ProcfsProcessReader>;
