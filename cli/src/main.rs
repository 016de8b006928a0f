//! PortScope CLI - Audit what is listening on this host
//!
//! Lists every listening TCP/UDP port with the process behind it, and
//! resolves Docker-published ports to their container and container port.

mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use portscope_core::{
    AuditService, DockerRegistry, HostAuditService, ProcfsProcessReader, SocketEnumerator,
    SocketSource,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "portscope")]
#[command(author, version, about = "Show what is listening on this host and why")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Skip Docker enrichment and report every port as a system process
    #[arg(long, global = true)]
    no_docker: bool,

    /// Seconds to wait for the Docker daemon
    #[arg(long, global = true, default_value_t = 5, value_name = "SECS")]
    timeout: u64,

    /// Socket table source
    #[arg(long, global = true, value_enum, default_value_t = Source::Auto)]
    source: Source,

    /// Path to the docker CLI (searched on default paths otherwise)
    #[arg(long, global = true, value_name = "PATH")]
    docker: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List all listening ports and their owners (default)
    #[command(alias = "ls")]
    List {
        /// Only show this port number
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show running containers and their published ports
    #[command(alias = "ps")]
    Containers,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    /// ss if installed, otherwise /proc/net
    Auto,
    /// ss -Htulnp
    Ss,
    /// /proc/net/{tcp,tcp6,udp,udp6}
    Procfs,
}

impl From<Source> for SocketSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Auto => SocketSource::Auto,
            Source::Ss => SocketSource::Ss,
            Source::Procfs => SocketSource::Procfs,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(unix)]
fn warn_if_unprivileged() {
    if !nix::unistd::Uid::effective().is_root() {
        warn!("Not running as root; sockets of other users will show an unknown owner");
    }
}

#[cfg(not(unix))]
fn warn_if_unprivileged() {}

fn build_service(cli: &Cli) -> HostAuditService {
    let registry = match &cli.docker {
        Some(path) => DockerRegistry::with_path(Some(path.clone())),
        None => DockerRegistry::new(),
    }
    .with_timeout(Duration::from_secs(cli.timeout));

    let service = AuditService::new(
        SocketEnumerator::new(cli.source.into()),
        registry,
        ProcfsProcessReader::new(),
    );

    if cli.no_docker {
        service.without_docker()
    } else {
        service
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    warn_if_unprivileged();

    let service = build_service(&cli);

    match cli.command {
        Some(Commands::List { port }) => commands::list::run(&service, port, cli.json).await?,
        Some(Commands::Containers) => commands::containers::run(&service, cli.json).await?,
        None => commands::list::run(&service, None, cli.json).await?,
    }

    Ok(())
}
