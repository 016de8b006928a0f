//! Container runtime models: published ports, proxies and registry state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Transport;

/// Process name of Docker's userland port proxy.
pub const DOCKER_PROXY: &str = "docker-proxy";

/// How a container is attached to the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkMode {
    /// Private namespace with published ports (bridge, user networks).
    Bridged,
    /// Shares the host's network namespace; no port remapping.
    Host,
}

/// A host port published by a running container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPortMapping {
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: Transport,
    pub container_name: String,

    /// Host address of the binding ("0.0.0.0", "::"), when the runtime reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,

    /// PIDs of the proxy processes serving this binding, once linked.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub proxy_pids: BTreeSet<u32>,
}

impl ContainerPortMapping {
    pub fn new(
        host_port: u16,
        container_port: u16,
        protocol: Transport,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            host_port,
            container_port,
            protocol,
            container_name: container_name.into(),
            host_ip: None,
            proxy_pids: BTreeSet::new(),
        }
    }

    pub fn with_host_ip(mut self, host_ip: impl Into<String>) -> Self {
        let ip = host_ip.into();
        self.host_ip = if ip.is_empty() { None } else { Some(ip) };
        self
    }

    pub fn with_proxy_pid(mut self, pid: u32) -> Self {
        self.proxy_pids.insert(pid);
        self
    }

    pub fn is_proxied(&self) -> bool {
        !self.proxy_pids.is_empty()
    }
}

/// A running container and its published ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDescriptor {
    pub name: String,
    pub id: String,
    pub network_mode: NetworkMode,
    pub port_mappings: Vec<ContainerPortMapping>,
}

/// Arguments of a running `docker-proxy`, read from its command line.
///
/// ```text
/// docker-proxy -proto tcp -host-ip 0.0.0.0 -host-port 6000 -container-ip 172.18.0.5 -container-port 9000
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyArgs {
    pub protocol: Transport,
    pub host_ip: Option<String>,
    pub host_port: u16,
    pub container_port: u16,
}

impl ProxyArgs {
    /// Parse a proxy command line. Returns `None` unless both ports are present.
    pub fn parse<S: AsRef<str>>(cmdline: &[S]) -> Option<Self> {
        let mut protocol = Transport::Tcp;
        let mut host_ip = None;
        let mut host_port = None;
        let mut container_port = None;

        let mut args = cmdline.iter().map(|s| AsRef::<str>::as_ref(s));
        while let Some(arg) = args.next() {
            // The Go flag package accepts both -flag and --flag.
            let flag = arg.trim_start_matches('-');
            let (name, inline) = match flag.split_once('=') {
                Some((n, v)) => (n, Some(v)),
                None => (flag, None),
            };
            if !matches!(name, "proto" | "host-ip" | "host-port" | "container-port") {
                continue;
            }
            let Some(value) = inline.or_else(|| args.next()) else {
                break;
            };

            match name {
                "proto" => protocol = Transport::parse(value)?,
                "host-ip" => host_ip = Some(value.to_string()),
                "host-port" => host_port = value.parse().ok(),
                _ => container_port = value.parse().ok(),
            }
        }

        Some(Self {
            protocol,
            host_ip,
            host_port: host_port?,
            container_port: container_port?,
        })
    }

    fn serves(&self, mapping: &ContainerPortMapping) -> bool {
        mapping.host_port == self.host_port
            && mapping.container_port == self.container_port
            && mapping.protocol == self.protocol
    }

    fn same_host_ip(&self, mapping: &ContainerPortMapping) -> bool {
        match (&self.host_ip, &mapping.host_ip) {
            (Some(a), Some(b)) => normalize_ip(a) == normalize_ip(b),
            _ => true,
        }
    }
}

fn normalize_ip(ip: &str) -> &str {
    ip.trim_start_matches('[').trim_end_matches(']')
}

/// Record proxy PIDs on the mappings they serve.
///
/// A proxy links to every mapping with the same ports and protocol whose host
/// address agrees with its `-host-ip`. When the runtime reports no binding for
/// that address (a single binding for a dual-stack port), the proxy links to
/// all mappings with matching ports instead. Several proxies may serve one
/// mapping. Returns the number of proxies that were linked.
pub fn link_proxies(containers: &mut [ContainerDescriptor], proxies: &[(u32, ProxyArgs)]) -> usize {
    let mut linked = 0;

    for (pid, args) in proxies {
        let exact_ip = containers
            .iter()
            .flat_map(|c| c.port_mappings.iter())
            .any(|m| args.serves(m) && args.same_host_ip(m));

        let mut found = false;
        for mapping in containers
            .iter_mut()
            .flat_map(|c| c.port_mappings.iter_mut())
            .filter(|m| args.serves(m))
        {
            if exact_ip && !args.same_host_ip(mapping) {
                continue;
            }
            mapping.proxy_pids.insert(*pid);
            found = true;
        }

        if found {
            linked += 1;
        }
    }

    linked
}

/// Result of querying the container runtime for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RegistryState {
    Available { containers: Vec<ContainerDescriptor> },
    Unavailable { reason: String },
}

impl RegistryState {
    pub fn containers(&self) -> &[ContainerDescriptor] {
        match self {
            RegistryState::Available { containers } => containers,
            RegistryState::Unavailable { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authentik() -> ContainerDescriptor {
        ContainerDescriptor {
            name: "authentik-server-1".to_string(),
            id: "abc".to_string(),
            network_mode: NetworkMode::Bridged,
            port_mappings: vec![
                ContainerPortMapping::new(6000, 9000, Transport::Tcp, "authentik-server-1")
                    .with_host_ip("0.0.0.0"),
                ContainerPortMapping::new(6000, 9000, Transport::Tcp, "authentik-server-1")
                    .with_host_ip("::"),
            ],
        }
    }

    #[test]
    fn test_parse_proxy_args() {
        let cmdline = [
            "/usr/bin/docker-proxy",
            "-proto",
            "tcp",
            "-host-ip",
            "0.0.0.0",
            "-host-port",
            "6000",
            "-container-ip",
            "172.18.0.5",
            "-container-port",
            "9000",
        ];
        let args = ProxyArgs::parse(&cmdline).unwrap();
        assert_eq!(args.protocol, Transport::Tcp);
        assert_eq!(args.host_ip.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.host_port, 6000);
        assert_eq!(args.container_port, 9000);
    }

    #[test]
    fn test_parse_proxy_args_inline_values() {
        let cmdline = ["docker-proxy", "--proto=udp", "--host-port=53", "--container-port=5353"];
        let args = ProxyArgs::parse(&cmdline).unwrap();
        assert_eq!(args.protocol, Transport::Udp);
        assert_eq!(args.host_port, 53);
        assert_eq!(args.container_port, 5353);
    }

    #[test]
    fn test_parse_proxy_args_incomplete() {
        assert!(ProxyArgs::parse(&["docker-proxy", "-host-port", "80"]).is_none());
        assert!(ProxyArgs::parse::<&str>(&[]).is_none());
    }

    #[test]
    fn test_link_proxies_by_host_ip() {
        let mut containers = vec![authentik()];
        let v4 = ProxyArgs {
            protocol: Transport::Tcp,
            host_ip: Some("0.0.0.0".to_string()),
            host_port: 6000,
            container_port: 9000,
        };
        let v6 = ProxyArgs {
            host_ip: Some("::".to_string()),
            ..v4.clone()
        };

        let linked = link_proxies(&mut containers, &[(24858, v6), (24851, v4)]);
        assert_eq!(linked, 2);

        let mappings = &containers[0].port_mappings;
        assert_eq!(mappings[0].proxy_pids, BTreeSet::from([24851]));
        assert_eq!(mappings[1].proxy_pids, BTreeSet::from([24858]));
    }

    #[test]
    fn test_link_proxies_ignores_other_ports() {
        let mut containers = vec![authentik()];
        let other = ProxyArgs {
            protocol: Transport::Udp,
            host_ip: None,
            host_port: 6000,
            container_port: 9000,
        };
        assert_eq!(link_proxies(&mut containers, &[(1, other)]), 0);
        assert!(containers[0].port_mappings.iter().all(|m| !m.is_proxied()));
    }

    #[test]
    fn test_link_dual_stack_proxies_to_single_binding() {
        let mut containers = vec![ContainerDescriptor {
            name: "authentik-server-1".to_string(),
            id: "abc".to_string(),
            network_mode: NetworkMode::Bridged,
            port_mappings: vec![ContainerPortMapping::new(
                6000,
                9000,
                Transport::Tcp,
                "authentik-server-1",
            )
            .with_host_ip("0.0.0.0")],
        }];
        let v4 = ProxyArgs {
            protocol: Transport::Tcp,
            host_ip: Some("0.0.0.0".to_string()),
            host_port: 6000,
            container_port: 9000,
        };
        let v6 = ProxyArgs {
            host_ip: Some("::".to_string()),
            ..v4.clone()
        };

        let linked = link_proxies(&mut containers, &[(24851, v4), (24858, v6)]);
        assert_eq!(linked, 2);
        assert_eq!(
            containers[0].port_mappings[0].proxy_pids,
            BTreeSet::from([24851, 24858])
        );
    }

    #[test]
    fn test_unavailable_registry_has_no_containers() {
        let state = RegistryState::Unavailable {
            reason: "docker CLI not found".to_string(),
        };
        assert!(state.containers().is_empty());
    }
}
