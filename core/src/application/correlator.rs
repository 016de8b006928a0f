//! Socket-to-owner correlation.
//!
//! Joins the listening sockets of a [`HostSnapshot`] with the container
//! registry and decides, per socket, whether a host process or a container
//! is behind it. Sockets with the same port and owner merge into one entry.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::domain::{
    ContainerDescriptor, ContainerPortMapping, HostSnapshot, ListeningSocket, NetworkMode, Owner,
    OwnerKey, PortEntry, ProcessLookup, Transport, UNKNOWN_PROCESS,
};

/// A published mapping together with the container that owns it.
#[derive(Clone, Copy)]
struct Candidate<'a> {
    container: &'a ContainerDescriptor,
    mapping: &'a ContainerPortMapping,
}

/// Mappings keyed by `(host_port, transport)`, each list ordered by container name.
struct MappingIndex<'a> {
    by_port: HashMap<(u16, Transport), Vec<Candidate<'a>>>,
    host_network: HashMap<&'a str, &'a ContainerDescriptor>,
}

impl<'a> MappingIndex<'a> {
    fn build(containers: &'a [ContainerDescriptor]) -> Self {
        let mut by_port: HashMap<(u16, Transport), Vec<Candidate<'a>>> = HashMap::new();
        let mut host_network = HashMap::new();

        for container in containers {
            if container.network_mode == NetworkMode::Host {
                host_network.insert(container.id.as_str(), container);
            }
            for mapping in &container.port_mappings {
                by_port
                    .entry((mapping.host_port, mapping.protocol))
                    .or_default()
                    .push(Candidate { container, mapping });
            }
        }

        for candidates in by_port.values_mut() {
            candidates.sort_by(|a, b| a.container.name.cmp(&b.container.name));
        }

        Self {
            by_port,
            host_network,
        }
    }

    fn candidates(&self, socket: &ListeningSocket) -> &[Candidate<'a>] {
        self.by_port
            .get(&(socket.port, socket.protocol.family()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn docker_owner(name: &str, container_port: u16, pid: Option<u32>, best_effort: bool) -> Owner {
    Owner::Docker {
        container_name: name.to_string(),
        pids: pid.into_iter().collect::<BTreeSet<_>>(),
        container_port,
        best_effort,
    }
}

/// Decide who owns one socket.
fn attribute(socket: &ListeningSocket, index: &MappingIndex<'_>, snapshot: &HostSnapshot) -> Owner {
    let process: Option<ProcessLookup> = socket.pid.map(|pid| snapshot.process(pid));
    let container_id = process.as_ref().and_then(|p| p.container_id());
    let candidates = index.candidates(socket);

    if !candidates.is_empty() {
        let by_proxy = socket
            .pid
            .and_then(|pid| candidates.iter().find(|c| c.mapping.proxy_pids.contains(&pid)));
        let by_cgroup =
            container_id.and_then(|id| candidates.iter().find(|c| c.container.id == id));

        if let Some(c) = by_proxy.or(by_cgroup) {
            return docker_owner(&c.container.name, c.mapping.container_port, socket.pid, false);
        }

        if !candidates.iter().any(|c| c.mapping.is_proxied()) {
            let c = candidates[0];
            debug!(
                port = socket.port,
                container = %c.container.name,
                "Attributing socket to container by port match only"
            );
            return docker_owner(&c.container.name, c.mapping.container_port, socket.pid, true);
        }

        // The port's proxies are known and this is a different process: keep
        // it as a separate System listener next to the container.
        debug!(
            port = socket.port,
            pid = ?socket.pid,
            "Socket shares a published port but is not its proxy"
        );
    }

    if let Some(container) = container_id.and_then(|id| index.host_network.get(id)) {
        return docker_owner(&container.name, socket.port, socket.pid, false);
    }

    Owner::System {
        name: process
            .as_ref()
            .map_or(UNKNOWN_PROCESS, |p| p.name())
            .to_string(),
        pid: socket.pid,
    }
}

/// Attribute every socket in the snapshot and merge per `(port, owner)`.
///
/// The result is ordered by port and owner key; [`crate::domain::Report::build`]
/// applies the display order.
pub fn correlate(snapshot: &HostSnapshot) -> Vec<PortEntry> {
    let index = MappingIndex::build(snapshot.registry.containers());
    let mut entries: BTreeMap<(u16, OwnerKey), PortEntry> = BTreeMap::new();

    for socket in &snapshot.sockets {
        let owner = attribute(socket, &index, snapshot);
        match entries.entry((socket.port, owner.key())) {
            Entry::Vacant(slot) => {
                slot.insert(PortEntry::from_socket(socket, owner));
            }
            Entry::Occupied(mut slot) => slot.get_mut().absorb(socket, owner),
        }
    }

    entries.into_values().collect()
}
