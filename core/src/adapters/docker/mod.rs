//! Docker container registry using the docker CLI.

mod models;

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::domain::ContainerDescriptor;
use crate::error::RegistryError;
use crate::ports::ContainerRegistryPort;

use super::sockets::find_executable;

pub use models::InspectContainer;

/// Default paths to search for docker.
const DOCKER_PATHS: &[&str] = &[
    "/usr/bin/docker",       // Distribution packages
    "/usr/local/bin/docker", // Static installs
    "/bin/docker",
    "/snap/bin/docker", // Snap
];

/// Default bound on the whole registry query.
pub const DEFAULT_DOCKER_TIMEOUT: Duration = Duration::from_secs(5);

/// Docker registry backed by `docker ps` and `docker inspect`.
pub struct DockerRegistry {
    docker_path: Option<PathBuf>,
    timeout: Duration,
}

impl DockerRegistry {
    /// Creates a new DockerRegistry, searching for docker.
    pub fn new() -> Self {
        Self::with_path(find_executable(DOCKER_PATHS))
    }

    /// Creates a new DockerRegistry with a custom docker path.
    pub fn with_path(docker_path: Option<PathBuf>) -> Self {
        Self {
            docker_path,
            timeout: DEFAULT_DOCKER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Lists running containers and their published ports.
    pub async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>, RegistryError> {
        timeout(self.timeout, self.query())
            .await
            .map_err(|_| RegistryError::Timeout)?
    }

    async fn query(&self) -> Result<Vec<ContainerDescriptor>, RegistryError> {
        let ids = self.execute_docker(&["ps", "-q", "--no-trunc"]).await?;
        let ids: Vec<&str> = ids.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if ids.is_empty() {
            debug!("No running containers");
            return Ok(Vec::new());
        }

        let mut args = vec!["inspect"];
        args.extend(ids);
        let output = self.run_docker(&args).await?;
        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| RegistryError::ParsingFailed(e.to_string()))?;

        // A container that exited after `ps` fails the whole command, but the
        // others are still printed.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stdout.trim_start().starts_with('[') {
                return Err(RegistryError::from_docker_error(&stderr));
            }
            debug!(stderr = %stderr.trim(), "docker inspect partially failed");
        }

        let containers = parse_inspect_output(&stdout)?;
        debug!(count = containers.len(), "Listed running containers");
        Ok(containers)
    }

    async fn run_docker(&self, args: &[&str]) -> Result<Output, RegistryError> {
        let docker_path = self
            .docker_path
            .as_ref()
            .ok_or(RegistryError::DockerNotFound)?;

        let output = Command::new(docker_path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(output)
    }

    /// Executes a docker command and returns its stdout.
    async fn execute_docker(&self, args: &[&str]) -> Result<String, RegistryError> {
        let output = self.run_docker(args).await?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| RegistryError::ParsingFailed(e.to_string()))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RegistryError::from_docker_error(&stderr))
        }
    }
}

impl Default for DockerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRegistryPort for DockerRegistry {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>, RegistryError> {
        DockerRegistry::list_containers(self).await
    }
}

/// Parse `docker inspect` output into descriptors sorted by name.
pub fn parse_inspect_output(output: &str) -> Result<Vec<ContainerDescriptor>, RegistryError> {
    let response: Vec<InspectContainer> =
        serde_json::from_str(output).map_err(|e| RegistryError::ParsingFailed(e.to_string()))?;

    let mut containers: Vec<ContainerDescriptor> = response
        .into_iter()
        .map(InspectContainer::into_descriptor)
        .collect();
    containers.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(containers)
}
