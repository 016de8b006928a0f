//! Correlated port entries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{ListeningSocket, Protocol};

/// Who is behind a listening port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Owner {
    /// A process running directly on the host.
    System { name: String, pid: Option<u32> },

    /// A port published by a container.
    #[serde(rename_all = "camelCase")]
    Docker {
        container_name: String,
        pids: BTreeSet<u32>,
        container_port: u16,
        /// Attributed from the port table alone, without a proxy or cgroup link.
        best_effort: bool,
    },
}

/// Merge key for owners: System by (name, pid), Docker by (container, container port).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnerKey {
    System(String, Option<u32>),
    Docker(String, u16),
}

impl Owner {
    pub fn key(&self) -> OwnerKey {
        match self {
            Owner::System { name, pid } => OwnerKey::System(name.clone(), *pid),
            Owner::Docker {
                container_name,
                container_port,
                ..
            } => OwnerKey::Docker(container_name.clone(), *container_port),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Owner::System { name, .. } => name,
            Owner::Docker { container_name, .. } => container_name,
        }
    }

    pub fn is_docker(&self) -> bool {
        matches!(self, Owner::Docker { .. })
    }

    /// Report label, `[System]` or `[Docker]`.
    pub fn label(&self) -> &'static str {
        match self {
            Owner::System { .. } => "[System]",
            Owner::Docker { .. } => "[Docker]",
        }
    }
}

/// One owner of one port, with every protocol it listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEntry {
    pub port: u16,
    pub protocols: BTreeSet<Protocol>,
    pub owner: Owner,
}

impl PortEntry {
    /// Start an entry from the first socket attributed to `owner`.
    pub fn from_socket(socket: &ListeningSocket, owner: Owner) -> Self {
        Self {
            port: socket.port,
            protocols: BTreeSet::from([socket.protocol]),
            owner,
        }
    }

    /// Fold another contribution for the same port and owner key into this entry.
    pub fn absorb(&mut self, socket: &ListeningSocket, owner: Owner) {
        debug_assert_eq!(self.port, socket.port);
        debug_assert_eq!(self.owner.key(), owner.key());

        self.protocols.insert(socket.protocol);

        if let (
            Owner::Docker {
                pids, best_effort, ..
            },
            Owner::Docker {
                pids: more,
                best_effort: inferred,
                ..
            },
        ) = (&mut self.owner, owner)
        {
            pids.extend(more);
            *best_effort = *best_effort && inferred;
        }
    }

    /// Comma-separated protocol list, e.g. "tcp, tcp6".
    pub fn protocol_list(&self) -> String {
        self.protocols
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
