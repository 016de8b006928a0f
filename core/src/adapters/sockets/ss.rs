//! Socket enumeration using `ss`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::{ListeningSocket, Protocol, Transport};
use crate::error::{Error, Result};

use super::utils::Utils;
use super::{find_executable, Enumerator};

/// Default paths to search for ss.
const SS_PATHS: &[&str] = &["/usr/sbin/ss", "/usr/bin/ss", "/sbin/ss", "/bin/ss"];

fn users_regex() -> &'static Regex {
    static USERS: OnceLock<Regex> = OnceLock::new();
    USERS.get_or_init(|| {
        Regex::new(r#"users:\(\("(.*?)",pid=(\d+),fd=(\d+)\)"#).expect("valid users regex")
    })
}

/// Enumerates listening sockets with `ss -Htulnp`.
pub struct SsEnumerator {
    ss_path: PathBuf,
}

impl SsEnumerator {
    /// Locate `ss` on the default paths.
    pub fn locate() -> Option<Self> {
        find_executable(SS_PATHS).map(Self::with_path)
    }

    pub fn with_path(ss_path: impl Into<PathBuf>) -> Self {
        Self {
            ss_path: ss_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.ss_path
    }

    /// Parse ss output into listening sockets.
    ///
    /// Expected ss output format:
    /// ```text
    /// tcp   LISTEN 0      128          0.0.0.0:22        0.0.0.0:*    users:(("sshd",pid=708,fd=3))
    /// udp   UNCONN 0      0      127.0.0.53%lo:53        0.0.0.0:*
    /// ```
    fn parse_ss_output(&self, output: &str) -> Vec<ListeningSocket> {
        let mut sockets = Vec::new();
        let mut seen: HashSet<ListeningSocket> = HashSet::new();

        for line in output.lines() {
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(line) {
                Some(socket) => {
                    if seen.insert(socket.clone()) {
                        sockets.push(socket);
                    }
                }
                None => warn!(line = line, "Skipping malformed ss entry"),
            }
        }

        sockets.sort_by_key(|s| (s.port, s.protocol));
        sockets
    }
}

/// Parse one `ss` line; `None` when it is malformed.
fn parse_line(line: &str) -> Option<ListeningSocket> {
    // Columns: [Netid] [State] [Recv-Q] [Send-Q] [Local Address:Port] [Peer Address:Port] [Process]
    let components: Vec<&str> = line.split_whitespace().collect();
    if components.len() < 6 {
        return None;
    }

    let transport = Transport::parse(components[0])?;
    let (address, port) = Utils::parse_address(components[4])?;
    let protocol = Protocol::new(transport, Utils::is_ipv6_address(&address));

    let pid = match users_regex().captures(line) {
        Some(caps) => Some(caps[2].parse::<u32>().ok()?),
        None => None,
    };

    Some(ListeningSocket::new(port, protocol, pid).with_address(address))
}

impl Enumerator for SsEnumerator {
    /// Executes: `ss -Htulnp`
    ///
    /// Flags explained:
    /// -H, --no-header     Suppress header line
    /// -t, --tcp           display only TCP sockets
    /// -u, --udp           display only UDP sockets
    /// -l, --listening     display listening sockets
    /// -n, --numeric       don't resolve service names
    /// -p, --processes     show process using socket
    async fn enumerate(&self) -> Result<Vec<ListeningSocket>> {
        let output = Command::new(&self.ss_path)
            .args(["-Htulnp"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run ss: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lower = stderr.to_lowercase();
            if lower.contains("permission denied") || lower.contains("operation not permitted") {
                return Err(Error::PermissionDenied(stderr.trim().to_string()));
            }
            return Err(Error::CommandFailed(format!(
                "ss exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in ss output: {}", e)))?;

        let sockets = self.parse_ss_output(&stdout);
        debug!(count = sockets.len(), "Enumerated sockets with ss");
        Ok(sockets)
    }
}
