//! Application layer - Use case services.
//!
//! This module contains application services that orchestrate
//! domain logic and adapter interactions.
//!
//! Services are designed to be thin orchestrators that:
//! - Accept domain types as inputs
//! - Use ports (traits) for external dependencies
//! - Return domain types as outputs

mod audit_service;
mod correlator;
mod resolver;

pub use audit_service::{build_report, AuditService, DOCKER_DISABLED};
pub use correlator::correlate;
pub use resolver::ProcessResolver;
