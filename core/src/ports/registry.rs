//! Container registry port (interface).

use crate::domain::ContainerDescriptor;
use crate::error::RegistryError;

/// Port for querying the container runtime.
///
/// Implementations handle runtime-specific details (docker CLI, API socket).
pub trait ContainerRegistryPort: Send + Sync {
    /// List running containers with their published ports.
    ///
    /// Proxy PIDs are left unset; they are linked later from the socket owners.
    fn list_containers(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ContainerDescriptor>, RegistryError>> + Send;
}
