//! Example: Enumerate raw listening sockets and their owning processes.

use portscope_core::application::ProcessResolver;
use portscope_core::{ProcfsProcessReader, SocketEnumerator, SocketSource};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("Reading socket table...\n");

    let enumerator = SocketEnumerator::new(SocketSource::Auto);
    let resolver = ProcessResolver::new(ProcfsProcessReader::new());

    match enumerator.enumerate().await {
        Ok(sockets) => {
            if sockets.is_empty() {
                println!("No listening sockets found.");
                return;
            }

            println!(
                "{:<6} {:<6} {:<24} {:<8} {}",
                "PORT", "PROTO", "ADDRESS", "PID", "PROCESS"
            );
            println!("{}", "-".repeat(70));

            for socket in &sockets {
                let (pid, name) = match socket.pid {
                    Some(pid) => (pid.to_string(), resolver.resolve(pid).await.name().to_string()),
                    None => ("-".to_string(), "-".to_string()),
                };

                println!(
                    "{:<6} {:<6} {:<24} {:<8} {}",
                    socket.port,
                    socket.protocol,
                    &socket.address[..socket.address.len().min(24)],
                    pid,
                    name
                );
            }

            println!(
                "\nTotal: {} sockets, {} distinct processes",
                sockets.len(),
                resolver.cached_len()
            );
        }
        Err(e) => {
            eprintln!("Error reading sockets: {}", e);
        }
    }
}
