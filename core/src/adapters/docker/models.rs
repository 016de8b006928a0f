//! `docker inspect` JSON response parsing.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{ContainerDescriptor, ContainerPortMapping, NetworkMode, Transport};

/// One element of the `docker inspect` array.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectContainer {
    pub id: String,
    pub name: String,
    pub host_config: Option<HostConfig>,
    pub network_settings: Option<NetworkSettings>,
    pub config: Option<ContainerConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    pub network_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkSettings {
    /// `"9000/tcp": [{"HostIp": "0.0.0.0", "HostPort": "6000"}]`; unpublished ports map to null.
    pub ports: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    pub host_ip: Option<String>,
    pub host_port: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    /// `"8080/tcp": {}`
    pub exposed_ports: Option<BTreeMap<String, serde_json::Value>>,
}

/// Split a port key such as `9000/tcp`. Non-TCP/UDP protocols yield `None`.
fn parse_port_key(key: &str) -> Option<(u16, Transport)> {
    let (port, proto) = key.split_once('/').unwrap_or((key, "tcp"));
    Some((port.parse().ok()?, Transport::parse(proto)?))
}

impl InspectContainer {
    fn network_mode(&self) -> NetworkMode {
        match self.host_config.as_ref().and_then(|h| h.network_mode.as_deref()) {
            Some("host") => NetworkMode::Host,
            _ => NetworkMode::Bridged,
        }
    }

    /// Converts the inspect response to a ContainerDescriptor.
    ///
    /// Host-network containers publish nothing; their exposed ports become
    /// identity mappings.
    pub fn into_descriptor(self) -> ContainerDescriptor {
        let name = self.name.trim_start_matches('/').to_string();
        let network_mode = self.network_mode();
        let mut port_mappings = Vec::new();

        match network_mode {
            NetworkMode::Bridged => {
                let ports = self
                    .network_settings
                    .and_then(|n| n.ports)
                    .unwrap_or_default();

                for (key, bindings) in ports {
                    let Some((container_port, protocol)) = parse_port_key(&key) else {
                        continue;
                    };
                    for binding in bindings.unwrap_or_default() {
                        let Some(host_port) = binding
                            .host_port
                            .as_deref()
                            .and_then(|p| p.parse::<u16>().ok())
                        else {
                            continue;
                        };
                        port_mappings.push(
                            ContainerPortMapping::new(host_port, container_port, protocol, &name)
                                .with_host_ip(binding.host_ip.unwrap_or_default()),
                        );
                    }
                }
            }
            NetworkMode::Host => {
                let exposed = self
                    .config
                    .and_then(|c| c.exposed_ports)
                    .unwrap_or_default();

                for key in exposed.keys() {
                    if let Some((port, protocol)) = parse_port_key(key) {
                        port_mappings.push(ContainerPortMapping::new(port, port, protocol, &name));
                    }
                }
            }
        }

        port_mappings.sort_by(|a, b| {
            (a.host_port, a.protocol, &a.host_ip).cmp(&(b.host_port, b.protocol, &b.host_ip))
        });

        ContainerDescriptor {
            name,
            id: self.id,
            network_mode,
            port_mappings,
        }
    }
}
