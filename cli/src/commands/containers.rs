//! Containers command - show the Docker registry view used for enrichment.

use anyhow::Result;
use portscope_core::{ContainerDescriptor, HostAuditService, NetworkMode, RegistryState};

pub async fn run(service: &HostAuditService, json: bool) -> Result<()> {
    let snapshot = service.snapshot().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.registry)?);
        return Ok(());
    }

    let containers = match &snapshot.registry {
        RegistryState::Available { containers } => containers,
        RegistryState::Unavailable { reason } => {
            eprintln!("note: Docker registry unavailable: {}", reason);
            return Ok(());
        }
    };

    if containers.is_empty() {
        println!("No running containers.");
        return Ok(());
    }

    for (i, container) in containers.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_container(container);
    }

    Ok(())
}

fn print_container(container: &ContainerDescriptor) {
    let mode = match container.network_mode {
        NetworkMode::Bridged => "bridged",
        NetworkMode::Host => "host network",
    };
    let short_id: String = container.id.chars().take(12).collect();
    println!("{} ({}) [{}]", container.name, short_id, mode);

    if container.port_mappings.is_empty() {
        println!("  no published ports");
    }

    for mapping in &container.port_mappings {
        let host_ip = mapping.host_ip.as_deref().unwrap_or("*");
        let proxy = if mapping.is_proxied() {
            mapping
                .proxy_pids
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            "none".to_string()
        };
        println!(
            "  {}:{}/{} -> {} (proxy PIDs: {})",
            host_ip, mapping.host_port, mapping.protocol, mapping.container_port, proxy
        );
    }
}
