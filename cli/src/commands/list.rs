//! List command - show all listening ports and their owners.

use anyhow::Result;
use portscope_core::HostAuditService;

pub async fn run(service: &HostAuditService, port_filter: Option<u16>, json: bool) -> Result<()> {
    let mut report = service.run().await?;

    if let Some(p) = port_filter {
        report.retain_port(p);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for note in &report.notes {
        eprintln!("note: {}", note);
    }

    if report.is_empty() {
        match port_filter {
            Some(p) => println!("Nothing is listening on port {}.", p),
            None => println!("No listening ports found."),
        }
        return Ok(());
    }

    print!("{}", report);
    Ok(())
}
