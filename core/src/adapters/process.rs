//! Process metadata from procfs.

use std::path::{Path, PathBuf};

use procfs::process::Process;
use tracing::debug;

use crate::domain::{container_id_from_cgroups, ProcessInfo};
use crate::ports::ProcessReaderPort;

/// Reads a process's name, command line and cgroups under `<root>/<pid>/`.
pub struct ProcfsProcessReader {
    root: PathBuf,
}

impl ProcfsProcessReader {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Use an alternative proc root (for testing).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcfsProcessReader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_process(root: &Path, pid: u32) -> Option<ProcessInfo> {
    let process = match Process::new_with_root(root.join(pid.to_string())) {
        Ok(process) => process,
        Err(e) => {
            debug!(pid = pid, error = %e, "Process metadata unavailable");
            return None;
        }
    };

    let name = match process.stat() {
        Ok(stat) => stat.comm,
        Err(e) => {
            debug!(pid = pid, error = %e, "Process metadata unavailable");
            return None;
        }
    };

    // The rest is best-effort; comm alone identifies the process.
    let cmdline = process.cmdline().unwrap_or_default();
    let container_id = process
        .cgroups()
        .ok()
        .and_then(|groups| container_id_from_cgroups(groups.into_iter().map(|g| g.pathname)));

    Some(ProcessInfo {
        pid,
        name,
        cmdline,
        container_id,
    })
}

impl ProcessReaderPort for ProcfsProcessReader {
    async fn read(&self, pid: u32) -> Option<ProcessInfo> {
        let root = self.root.clone();
        match tokio::task::spawn_blocking(move || read_process(&root, pid)).await {
            Ok(info) => info,
            Err(e) => {
                debug!(pid = pid, error = %e, "Process lookup aborted");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_process(root: &Path, pid: u32, comm: &str) -> PathBuf {
        let dir = root.join(pid.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("stat"),
            format!(
                "{pid} ({comm}) S 1 {pid} {pid} 0 -1 4194560 301 0 0 0 2 5 0 0 20 0 7 0 1234567 \
                 1170046976 1024 18446744073709551615 1 1 0 0 0 0 0 0 2143420159 0 0 0 17 2 0 0 \
                 0 0 0 0 0 0 0 0 0 0 0\n"
            ),
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_read_process() {
        let dir = tempdir().unwrap();
        let proc_dir = write_process(dir.path(), 24851, "docker-proxy");
        std::fs::write(
            proc_dir.join("cmdline"),
            b"/usr/bin/docker-proxy\0-proto\0tcp\0-host-port\x006000\0",
        )
        .unwrap();
        std::fs::write(proc_dir.join("cgroup"), "0::/system.slice/docker.service\n").unwrap();

        let reader = ProcfsProcessReader::with_root(dir.path());
        let info = reader.read(24851).await.unwrap();
        assert_eq!(info.name, "docker-proxy");
        assert_eq!(
            info.cmdline,
            vec!["/usr/bin/docker-proxy", "-proto", "tcp", "-host-port", "6000"]
        );
        assert!(info.container_id.is_none());
    }

    #[tokio::test]
    async fn test_read_containerized_process() {
        let id = "a".repeat(64);
        let dir = tempdir().unwrap();
        let proc_dir = write_process(dir.path(), 4242, "postgres");
        std::fs::write(proc_dir.join("cmdline"), b"").unwrap();
        std::fs::write(proc_dir.join("cgroup"), format!("0::/system.slice/docker-{id}.scope\n"))
            .unwrap();

        let info = ProcfsProcessReader::with_root(dir.path()).read(4242).await.unwrap();
        assert_eq!(info.name, "postgres");
        assert!(info.cmdline.is_empty());
        assert_eq!(info.container_id.as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_exited_process() {
        let dir = tempdir().unwrap();
        let reader = ProcfsProcessReader::with_root(dir.path());
        assert!(reader.read(5).await.is_none());
    }
}
