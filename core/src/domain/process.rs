//! Process models.

use serde::{Deserialize, Serialize};

/// Name used for owners whose process could not be read.
pub const UNKNOWN_PROCESS: &str = "unknown";

/// Information about a running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,

    /// Short process name (e.g. "sshd", "docker-proxy").
    pub name: String,

    /// Full argument vector, empty for kernel threads or when unreadable.
    pub cmdline: Vec<String>,

    /// Docker container ID this process runs in, if its cgroup names one.
    pub container_id: Option<String>,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cmdline: Vec::new(),
            container_id: None,
        }
    }

    pub fn with_cmdline<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmdline = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = Some(id.into());
        self
    }
}

/// Outcome of resolving a PID.
///
/// `Unknown` covers both a process that exited before it was read and one
/// whose metadata the caller may not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProcessLookup {
    Found(ProcessInfo),
    Unknown { pid: u32 },
}

impl ProcessLookup {
    pub fn pid(&self) -> u32 {
        match self {
            ProcessLookup::Found(info) => info.pid,
            ProcessLookup::Unknown { pid } => *pid,
        }
    }

    /// The process name, or `unknown`.
    pub fn name(&self) -> &str {
        match self {
            ProcessLookup::Found(info) => &info.name,
            ProcessLookup::Unknown { .. } => UNKNOWN_PROCESS,
        }
    }

    pub fn info(&self) -> Option<&ProcessInfo> {
        match self {
            ProcessLookup::Found(info) => Some(info),
            ProcessLookup::Unknown { .. } => None,
        }
    }

    pub fn container_id(&self) -> Option<&str> {
        self.info().and_then(|i| i.container_id.as_deref())
    }
}

/// Extract a Docker container ID from a process's cgroup paths.
///
/// Recognizes the systemd driver layout (`docker-<id>.scope`) and the
/// cgroupfs layout (`/docker/<id>`).
pub fn container_id_from_cgroups<I, S>(paths: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paths.into_iter().find_map(|path| {
        path.as_ref().split('/').find_map(|segment| {
            let candidate = segment
                .strip_prefix("docker-")
                .and_then(|s| s.strip_suffix(".scope"))
                .unwrap_or(segment);
            is_container_id(candidate).then(|| candidate.to_string())
        })
    })
}

fn is_container_id(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}
