//! Error types for the portscope-core library.

use thiserror::Error;

/// Result type alias for portscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a port audit.
///
/// Only socket enumeration failures are fatal. Process lookups and the
/// container registry degrade into data instead of returning these.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to execute a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to parse command output.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// Permission denied for an operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The kernel socket table could not be read.
    #[error("Socket enumeration failed: {0}")]
    Enumeration(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Errors raised while querying the container runtime.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No docker executable was found.
    #[error("docker CLI not found")]
    DockerNotFound,

    /// The runtime did not answer in time.
    #[error("docker query timed out")]
    Timeout,

    /// The CLI exists but the daemon is not reachable.
    #[error("Docker daemon unavailable: {0}")]
    DaemonUnavailable(String),

    /// The CLI exited with an error unrelated to daemon reachability.
    #[error("docker command failed: {0}")]
    CommandFailed(String),

    /// Output could not be decoded.
    #[error("Failed to parse docker output: {0}")]
    ParsingFailed(String),

    /// I/O error while spawning the CLI.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Classify a docker CLI stderr message.
    pub fn from_docker_error(stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        let lower = message.to_lowercase();

        const UNREACHABLE: &[&str] = &[
            "cannot connect to the docker daemon",
            "is the docker daemon running",
            "permission denied while trying to connect",
            "connection refused",
            "no such file or directory",
        ];

        if UNREACHABLE.iter().any(|p| lower.contains(p)) {
            RegistryError::DaemonUnavailable(message)
        } else {
            RegistryError::CommandFailed(message)
        }
    }

    /// Returns true when the runtime itself is missing or unreachable.
    pub fn is_daemon_unavailable(&self) -> bool {
        matches!(
            self,
            RegistryError::DockerNotFound
                | RegistryError::Timeout
                | RegistryError::DaemonUnavailable(_)
        )
    }
}
