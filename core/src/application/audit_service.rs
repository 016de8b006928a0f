//! Port audit application service.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::domain::{
    link_proxies, HostSnapshot, ProcessLookup, ProxyArgs, RegistryState, Report, DOCKER_PROXY,
};
use crate::error::Result;
use crate::ports::{ContainerRegistryPort, ProcessReaderPort, SocketEnumeratorPort};

use super::correlator::correlate;
use super::resolver::ProcessResolver;

/// Reason recorded when Docker enrichment is turned off by the caller.
pub const DOCKER_DISABLED: &str = "disabled";

/// Application service running the whole audit pipeline.
///
/// Enumerates sockets, queries the container registry, resolves socket
/// owners, links proxy processes to published ports, then correlates.
pub struct AuditService<S, C, P>
where
    S: SocketEnumeratorPort,
    C: ContainerRegistryPort,
    P: ProcessReaderPort,
{
    sockets: S,
    registry: C,
    resolver: ProcessResolver<P>,
    docker_enabled: bool,
}

impl<S, C, P> AuditService<S, C, P>
where
    S: SocketEnumeratorPort,
    C: ContainerRegistryPort,
    P: ProcessReaderPort,
{
    /// Create a new audit service from its adapters.
    pub fn new(sockets: S, registry: C, reader: P) -> Self {
        Self {
            sockets,
            registry,
            resolver: ProcessResolver::new(reader),
            docker_enabled: true,
        }
    }

    /// Skip the container registry; every socket is reported as System.
    pub fn without_docker(mut self) -> Self {
        self.docker_enabled = false;
        self
    }

    /// Query the registry, degrading any failure into `Unavailable`.
    async fn query_registry(&self) -> RegistryState {
        if !self.docker_enabled {
            return RegistryState::Unavailable {
                reason: DOCKER_DISABLED.to_string(),
            };
        }

        match self.registry.list_containers().await {
            Ok(containers) => RegistryState::Available { containers },
            Err(e) => {
                if e.is_daemon_unavailable() {
                    info!(reason = %e, "Docker enrichment skipped");
                } else {
                    warn!(error = %e, "Docker enrichment skipped");
                }
                RegistryState::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Gather a frozen snapshot of sockets, processes and containers.
    ///
    /// Fails only when the socket table cannot be read.
    pub async fn snapshot(&self) -> Result<HostSnapshot> {
        self.resolver.clear();

        let sockets = self.sockets.enumerate().await?;
        let registry = self.query_registry().await;

        let pids: BTreeSet<u32> = sockets.iter().filter_map(|s| s.pid).collect();
        let processes = self.resolver.resolve_all(pids).await;

        let registry = match registry {
            RegistryState::Available { mut containers } => {
                let proxies = proxy_args(&processes);
                let linked = link_proxies(&mut containers, &proxies);
                debug!(proxies = proxies.len(), linked = linked, "Linked docker-proxy processes");
                RegistryState::Available { containers }
            }
            unavailable => unavailable,
        };

        Ok(HostSnapshot::new(sockets, processes, registry))
    }

    /// Run a full audit and build the report.
    pub async fn run(&self) -> Result<Report> {
        let snapshot = self.snapshot().await?;
        Ok(build_report(&snapshot))
    }
}

/// Correlate a snapshot and attach the informational notes.
pub fn build_report(snapshot: &HostSnapshot) -> Report {
    let notes = match &snapshot.registry {
        RegistryState::Available { .. } => Vec::new(),
        RegistryState::Unavailable { reason } => {
            vec![format!("Docker enrichment skipped: {}", reason)]
        }
    };
    Report::build(correlate(snapshot), notes)
}

/// Parse the command line of every resolved `docker-proxy`, ordered by PID.
fn proxy_args(processes: &HashMap<u32, ProcessLookup>) -> Vec<(u32, ProxyArgs)> {
    let mut proxies: Vec<(u32, ProxyArgs)> = processes
        .values()
        .filter_map(ProcessLookup::info)
        .filter(|info| info.name == DOCKER_PROXY)
        .filter_map(|info| match ProxyArgs::parse(info.cmdline.as_slice()) {
            Some(args) => Some((info.pid, args)),
            None => {
                debug!(pid = info.pid, "docker-proxy without port arguments");
                None
            }
        })
        .collect();
    proxies.sort_by_key(|(pid, _)| *pid);
    proxies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ContainerDescriptor, ContainerPortMapping, ListeningSocket, NetworkMode, Owner,
        ProcessInfo, Protocol, Transport,
    };
    use crate::error::{Error, RegistryError};

    /// Mock socket table for testing.
    struct MockSockets {
        sockets: Vec<ListeningSocket>,
        denied: bool,
    }

    impl SocketEnumeratorPort for MockSockets {
        async fn enumerate(&self) -> Result<Vec<ListeningSocket>> {
            if self.denied {
                return Err(Error::PermissionDenied("/proc/net/tcp".to_string()));
            }
            Ok(self.sockets.clone())
        }
    }

    /// Mock registry returning a fixed list or a timeout.
    struct MockRegistry {
        containers: Option<Vec<ContainerDescriptor>>,
    }

    impl ContainerRegistryPort for MockRegistry {
        async fn list_containers(
            &self,
        ) -> std::result::Result<Vec<ContainerDescriptor>, RegistryError> {
            self.containers.clone().ok_or(RegistryError::Timeout)
        }
    }

    /// Mock process table.
    struct MockReader {
        processes: HashMap<u32, ProcessInfo>,
    }

    impl ProcessReaderPort for MockReader {
        async fn read(&self, pid: u32) -> Option<ProcessInfo> {
            self.processes.get(&pid).cloned()
        }
    }

    fn proxy(pid: u32, host_ip: &str) -> ProcessInfo {
        ProcessInfo::new(pid, "docker-proxy").with_cmdline([
            "/usr/bin/docker-proxy",
            "-proto",
            "tcp",
            "-host-ip",
            host_ip,
            "-host-port",
            "6000",
            "-container-ip",
            "172.18.0.5",
            "-container-port",
            "9000",
        ])
    }

    fn host() -> (MockSockets, MockReader) {
        let sockets = MockSockets {
            sockets: vec![
                ListeningSocket::new(22, Protocol::Tcp, Some(708)),
                ListeningSocket::new(22, Protocol::Tcp6, Some(708)),
                ListeningSocket::new(6000, Protocol::Tcp, Some(24851)),
                ListeningSocket::new(6000, Protocol::Tcp6, Some(24858)),
                ListeningSocket::new(9999, Protocol::Udp, Some(5)),
            ],
            denied: false,
        };
        let reader = MockReader {
            processes: HashMap::from([
                (708, ProcessInfo::new(708, "sshd")),
                (24851, proxy(24851, "0.0.0.0")),
                (24858, proxy(24858, "::")),
            ]),
        };
        (sockets, reader)
    }

    fn authentik() -> ContainerDescriptor {
        ContainerDescriptor {
            name: "authentik-server-1".to_string(),
            id: "5c1b0e6f".to_string(),
            network_mode: NetworkMode::Bridged,
            port_mappings: vec![
                ContainerPortMapping::new(6000, 9000, Transport::Tcp, "authentik-server-1")
                    .with_host_ip("0.0.0.0"),
                ContainerPortMapping::new(6000, 9000, Transport::Tcp, "authentik-server-1")
                    .with_host_ip("::"),
            ],
        }
    }

    #[tokio::test]
    async fn test_full_audit() {
        let (sockets, reader) = host();
        let registry = MockRegistry {
            containers: Some(vec![authentik()]),
        };
        let service = AuditService::new(sockets, registry, reader);

        let report = service.run().await.unwrap();
        assert!(report.notes.is_empty());
        assert_eq!(
            report.render(),
            "Port 22 (tcp, tcp6)\n  [System] sshd (PID: 708)\n\n\
             Port 6000 (tcp, tcp6)\n  [Docker] authentik-server-1 (PID: 24851, 24858) [container port: 9000]\n\n\
             Port 9999 (udp)\n  [System] unknown (PID: 5)\n"
        );
    }

    #[tokio::test]
    async fn test_proxies_are_linked_in_snapshot() {
        let (sockets, reader) = host();
        let registry = MockRegistry {
            containers: Some(vec![authentik()]),
        };
        let service = AuditService::new(sockets, registry, reader);

        let snapshot = service.snapshot().await.unwrap();
        let mappings = &snapshot.registry.containers()[0].port_mappings;
        assert_eq!(mappings[0].proxy_pids, BTreeSet::from([24851]));
        assert_eq!(mappings[1].proxy_pids, BTreeSet::from([24858]));

        let report = build_report(&snapshot);
        match &report.entries[1].owner {
            Owner::Docker { best_effort, .. } => assert!(!best_effort),
            other => panic!("expected docker owner, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dual_stack_proxies_share_single_binding() {
        let (sockets, reader) = host();
        let container = ContainerDescriptor {
            port_mappings: vec![ContainerPortMapping::new(
                6000,
                9000,
                Transport::Tcp,
                "authentik-server-1",
            )],
            ..authentik()
        };
        let registry = MockRegistry {
            containers: Some(vec![container]),
        };
        let service = AuditService::new(sockets, registry, reader);

        let report = service.run().await.unwrap();
        assert!(!report.render().contains("[System] docker-proxy"));
        assert_eq!(
            report.render(),
            "Port 22 (tcp, tcp6)\n  [System] sshd (PID: 708)\n\n\
             Port 6000 (tcp, tcp6)\n  [Docker] authentik-server-1 (PID: 24851, 24858) [container port: 9000]\n\n\
             Port 9999 (udp)\n  [System] unknown (PID: 5)\n"
        );
    }

    #[tokio::test]
    async fn test_registry_timeout_degrades() {
        let (sockets, reader) = host();
        let service = AuditService::new(sockets, MockRegistry { containers: None }, reader);

        let report = service.run().await.unwrap();
        assert!(report.entries.iter().all(|e| !e.owner.is_docker()));
        assert_eq!(report.notes, vec!["Docker enrichment skipped: docker query timed out"]);
        assert!(report.render().contains("[System] docker-proxy (PID: 24851)"));
    }

    #[tokio::test]
    async fn test_docker_disabled() {
        let (sockets, reader) = host();
        let registry = MockRegistry {
            containers: Some(vec![authentik()]),
        };
        let service = AuditService::new(sockets, registry, reader).without_docker();

        let snapshot = service.snapshot().await.unwrap();
        assert!(matches!(
            snapshot.registry,
            RegistryState::Unavailable { ref reason } if reason == DOCKER_DISABLED
        ));
        assert!(build_report(&snapshot)
            .entries
            .iter()
            .all(|e| !e.owner.is_docker()));
    }

    #[tokio::test]
    async fn test_socket_table_failure_is_fatal() {
        let (_, reader) = host();
        let sockets = MockSockets {
            sockets: Vec::new(),
            denied: true,
        };
        let service = AuditService::new(sockets, MockRegistry { containers: None }, reader);

        let result = service.run().await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let (sockets, reader) = host();
        let registry = MockRegistry {
            containers: Some(vec![authentik()]),
        };
        let service = AuditService::new(sockets, registry, reader);

        let first = service.run().await.unwrap();
        let second = service.run().await.unwrap();
        assert_eq!(first, second);
    }
}
