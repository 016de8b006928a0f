//! Socket enumeration from `/proc/net`.
//!
//! Used when `ss` is not installed. Socket inodes are mapped to their owning
//! processes through each process's fd table.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use procfs::net::{TcpNetEntries, TcpState, UdpNetEntries, UdpState};
use procfs::process::{all_processes_with_root, FDTarget};
use procfs::{current_system_info, FromReadSI, ProcError};
use tracing::{debug, warn};

use crate::domain::{ListeningSocket, Protocol, Transport};
use crate::error::{Error, Result};

use super::Enumerator;

/// Enumerates listening sockets from the procfs socket tables.
pub struct ProcfsEnumerator {
    root: PathBuf,
}

impl ProcfsEnumerator {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Use an alternative proc root (for testing).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcfsEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Map socket inodes to the lowest PID holding them open.
fn socket_owners(root: &Path) -> HashMap<u64, u32> {
    let mut owners = HashMap::new();

    let processes = match all_processes_with_root(root) {
        Ok(processes) => processes,
        Err(e) => {
            warn!(error = %e, "Failed to list processes");
            return owners;
        }
    };

    // Exited processes and ones we may not inspect are skipped.
    let mut processes: Vec<_> = processes.filter_map(|p| p.ok()).collect();
    processes.sort_by_key(|p| p.pid());

    for process in processes {
        let Ok(pid) = u32::try_from(process.pid()) else {
            continue;
        };
        let Ok(fds) = process.fd() else {
            continue;
        };
        for fd in fds.flatten() {
            if let FDTarget::Socket(inode) = fd.target {
                owners.entry(inode).or_insert(pid);
            }
        }
    }

    owners
}

/// Read one socket table. `Ok(None)` when it is absent or unparseable.
fn read_table<T: FromReadSI>(path: &Path) -> Result<Option<T>> {
    match T::from_file(path, current_system_info()) {
        Ok(table) => Ok(Some(table)),
        // IPv6 may be disabled on this host
        Err(ProcError::NotFound(_)) => {
            debug!(path = %path.display(), "Socket table not present");
            Ok(None)
        }
        Err(ProcError::PermissionDenied(_)) => Err(Error::PermissionDenied(format!(
            "Cannot read {}",
            path.display()
        ))),
        Err(e @ (ProcError::Incomplete(_) | ProcError::Other(_))) => {
            warn!(path = %path.display(), error = %e, "Skipping malformed socket table");
            Ok(None)
        }
        Err(e) => Err(Error::Enumeration(format!(
            "Cannot read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn bind_address(addr: &SocketAddr) -> String {
    match addr {
        SocketAddr::V4(v4) => v4.ip().to_string(),
        SocketAddr::V6(v6) => format!("[{}]", v6.ip()),
    }
}

/// Listening entries of a TCP table as `(socket, inode)` pairs.
fn listening_tcp(table: TcpNetEntries, ipv6: bool) -> Vec<(ListeningSocket, u64)> {
    let protocol = Protocol::new(Transport::Tcp, ipv6);
    table
        .0
        .into_iter()
        .filter(|e| matches!(e.state, TcpState::Listen))
        .map(|e| {
            let socket = ListeningSocket::new(e.local_address.port(), protocol, None)
                .with_address(bind_address(&e.local_address));
            (socket, e.inode)
        })
        .collect()
}

/// Bound, unconnected entries of a UDP table as `(socket, inode)` pairs.
fn listening_udp(table: UdpNetEntries, ipv6: bool) -> Vec<(ListeningSocket, u64)> {
    let protocol = Protocol::new(Transport::Udp, ipv6);
    table
        .0
        .into_iter()
        .filter(|e| matches!(e.state, UdpState::Close) && e.remote_address.port() == 0)
        .map(|e| {
            let socket = ListeningSocket::new(e.local_address.port(), protocol, None)
                .with_address(bind_address(&e.local_address));
            (socket, e.inode)
        })
        .collect()
}

fn scan(root: &Path) -> Result<Vec<ListeningSocket>> {
    let net = root.join("net");
    let mut rows = Vec::new();
    let mut readable = 0;

    for ipv6 in [false, true] {
        let suffix = if ipv6 { "6" } else { "" };

        if let Some(table) = read_table::<TcpNetEntries>(&net.join(format!("tcp{suffix}")))? {
            readable += 1;
            rows.extend(listening_tcp(table, ipv6));
        }
        if let Some(table) = read_table::<UdpNetEntries>(&net.join(format!("udp{suffix}")))? {
            readable += 1;
            rows.extend(listening_udp(table, ipv6));
        }
    }

    if readable == 0 {
        return Err(Error::Enumeration(format!(
            "No socket tables found under {}",
            net.display()
        )));
    }

    let owners = socket_owners(root);
    let mut seen = HashSet::new();
    let mut sockets: Vec<ListeningSocket> = rows
        .into_iter()
        .map(|(mut socket, inode)| {
            socket.pid = owners.get(&inode).copied();
            socket
        })
        .filter(|socket| seen.insert(socket.clone()))
        .collect();

    sockets.sort_by_key(|s| (s.port, s.protocol));
    debug!(count = sockets.len(), "Enumerated sockets from procfs");
    Ok(sockets)
}

impl Enumerator for ProcfsEnumerator {
    async fn enumerate(&self) -> Result<Vec<ListeningSocket>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan(&root))
            .await
            .map_err(|e| Error::Enumeration(format!("procfs scan aborted: {}", e)))?
    }
}
