//! Report building and rendering.

use std::cmp::Ordering;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use super::{Owner, PortEntry};

/// Sorted, render-ready audit result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub entries: Vec<PortEntry>,

    /// Informational notes, such as skipped Docker enrichment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Report {
    /// Sort entries by port; entries on the same port put System before
    /// Docker, then order by owner name and PIDs.
    pub fn build(mut entries: Vec<PortEntry>, notes: Vec<String>) -> Self {
        entries.sort_by(compare_entries);
        Self { entries, notes }
    }

    /// Keep only entries for `port`.
    pub fn retain_port(&mut self, port: u16) {
        self.entries.retain(|e| e.port == port);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain-text rendering, one block per entry separated by blank lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "Port {} ({})", entry.port, entry.protocol_list());
            let _ = writeln!(out, "  {}", render_owner(&entry.owner));
        }
        out
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_owner(owner: &Owner) -> String {
    match owner {
        Owner::System { name, pid } => {
            let pid = pid.map_or_else(|| "unknown".to_string(), |p| p.to_string());
            format!("{} {} (PID: {})", owner.label(), name, pid)
        }
        Owner::Docker {
            container_name,
            pids,
            container_port,
            ..
        } => {
            let pids = if pids.is_empty() {
                "unknown".to_string()
            } else {
                pids.iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!(
                "{} {} (PID: {}) [container port: {}]",
                owner.label(),
                container_name,
                pids,
                container_port
            )
        }
    }
}

fn compare_entries(a: &PortEntry, b: &PortEntry) -> Ordering {
    a.port
        .cmp(&b.port)
        .then_with(|| a.owner.is_docker().cmp(&b.owner.is_docker()))
        .then_with(|| a.owner.name().cmp(b.owner.name()))
        .then_with(|| a.owner.key().cmp(&b.owner.key()))
        .then_with(|| first_pid(&a.owner).cmp(&first_pid(&b.owner)))
}

fn first_pid(owner: &Owner) -> Option<u32> {
    match owner {
        Owner::System { pid, .. } => *pid,
        Owner::Docker { pids, .. } => pids.iter().next().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ListeningSocket, Protocol};
    use std::collections::BTreeSet;

    fn system(port: u16, protocol: Protocol, name: &str, pid: Option<u32>) -> PortEntry {
        PortEntry::from_socket(
            &ListeningSocket::new(port, protocol, pid),
            Owner::System {
                name: name.to_string(),
                pid,
            },
        )
    }

    fn docker(port: u16, name: &str, pids: &[u32], container_port: u16) -> PortEntry {
        PortEntry::from_socket(
            &ListeningSocket::new(port, Protocol::Tcp, pids.first().copied()),
            Owner::Docker {
                container_name: name.to_string(),
                pids: pids.iter().copied().collect::<BTreeSet<_>>(),
                container_port,
                best_effort: false,
            },
        )
    }

    #[test]
    fn test_sorted_by_port_then_system_first() {
        let report = Report::build(
            vec![
                docker(8080, "api", &[30], 80),
                system(22, Protocol::Tcp, "sshd", Some(708)),
                system(8080, Protocol::Tcp, "nginx", Some(12)),
            ],
            Vec::new(),
        );

        let order: Vec<(u16, &str)> = report
            .entries
            .iter()
            .map(|e| (e.port, e.owner.name()))
            .collect();
        assert_eq!(order, vec![(22, "sshd"), (8080, "nginx"), (8080, "api")]);
    }

    #[test]
    fn test_render_format() {
        let mut sshd = system(22, Protocol::Tcp, "sshd", Some(708));
        sshd.protocols.insert(Protocol::Tcp6);
        let report = Report::build(
            vec![docker(6000, "authentik-server-1", &[24851, 24858], 9000), sshd],
            Vec::new(),
        );

        let expected = "Port 22 (tcp, tcp6)\n  [System] sshd (PID: 708)\n\n\
                        Port 6000 (tcp)\n  [Docker] authentik-server-1 (PID: 24851, 24858) [container port: 9000]\n";
        assert_eq!(report.render(), expected);
    }

    #[test]
    fn test_render_unknown_pids() {
        let report = Report::build(
            vec![
                system(53, Protocol::Udp, "unknown", None),
                docker(80, "web", &[], 80),
            ],
            Vec::new(),
        );
        let text = report.render();
        assert!(text.contains("[System] unknown (PID: unknown)"));
        assert!(text.contains("[Docker] web (PID: unknown) [container port: 80]"));
    }

    #[test]
    fn test_retain_port() {
        let mut report = Report::build(
            vec![
                system(22, Protocol::Tcp, "sshd", Some(1)),
                system(80, Protocol::Tcp, "nginx", Some(2)),
            ],
            Vec::new(),
        );
        report.retain_port(80);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].owner.name(), "nginx");
    }

    #[test]
    fn test_json_shape() {
        let report = Report::build(vec![docker(6000, "authentik", &[1], 9000)], Vec::new());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["owner"]["kind"], "docker");
        assert_eq!(json["entries"][0]["owner"]["containerPort"], 9000);
        assert_eq!(json["entries"][0]["protocols"][0], "tcp");
        assert!(json.get("notes").is_none());
    }
}
