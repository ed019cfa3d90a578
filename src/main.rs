use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tracesynth::configuration::Config;
use tracesynth::connection_log::LogTargets;
use tracesynth::error_handling::types::{ConfigError, LogError};
use tracesynth::session::Direction;

#[derive(Parser)]
#[command(name = "tracesynth")]
#[command(version = "0.0.2")]
#[command(about = "Synthesizes packet traces of intercepted TCP connections")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a synthetic conversation between two endpoints to the configured targets
    Replay {
        /// TOML configuration file
        #[arg(long, env = "TRACESYNTH_CONFIG")]
        config: PathBuf,
        /// Client endpoint, e.g. 192.0.2.1:40000
        #[arg(long)]
        client: SocketAddr,
        /// Server endpoint, e.g. 192.0.2.2:443
        #[arg(long)]
        server: SocketAddr,
        /// Bytes sent by the client
        #[arg(long)]
        request: Option<PathBuf>,
        /// Bytes sent back by the server
        #[arg(long)]
        response: Option<PathBuf>,
    },
    /// Resolve the hardware address of a mirror target
    Resolve {
        /// Interface the mirror target is reachable on
        #[arg(long)]
        interface: String,
        /// IPv4 address of the mirror target
        target: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Replay {
            config,
            client,
            server,
            request,
            response,
        } => replay(&config, client, server, request, response).await,
        Command::Resolve { interface, target } => resolve(&interface, &target).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn replay(
    config_path: &Path,
    client: SocketAddr,
    server: SocketAddr,
    request: Option<PathBuf>,
    response: Option<PathBuf>,
) -> Result<(), LogError> {
    info!("Importing configuration");
    let config = Config::from_file(config_path)?;
    info!("Configuration imported successfully");

    let request = read_payload(request.as_deref())?;
    let response = read_payload(response.as_deref())?;

    let targets = attach_mirror(LogTargets::from_config(&config)?, &config).await?;
    let logs = targets.open_connection(client, server)?;
    if logs.is_empty() {
        warn!("No log target configured, nothing written");
    }

    for mut log in logs {
        log.open()?;
        log.log_payload(Direction::ClientToServer, &request)?;
        log.log_payload(Direction::ServerToClient, &response)?;
        log.close(Direction::ClientToServer)?;
        info!("[{}] Conversation written", log.id());
    }
    Ok(())
}

fn read_payload(path: Option<&Path>) -> Result<Vec<u8>, LogError> {
    match path {
        Some(path) => std::fs::read(path).map_err(|e| ConfigError::IoError(e).into()),
        None => Ok(Vec::new()),
    }
}

#[cfg(feature = "live")]
async fn attach_mirror(targets: LogTargets, config: &Config) -> Result<LogTargets, LogError> {
    use tracesynth::error_handling::types::ResolveError;
    use tracesynth::mirror::pcap_link::PcapLink;
    use tracesynth::mirror::{resolve_detached, MirrorResolver};

    let Some(mirror) = &config.mirror else {
        return Ok(targets);
    };
    let link = PcapLink::open(&mirror.interface).map_err(ResolveError::Interface)?;
    let resolver = MirrorResolver::new(link).with_policy(config.resolver.policy());
    let (endpoint, resolver) =
        resolve_detached(resolver, mirror.target.clone(), config.resolver.deadline()).await?;
    Ok(targets.with_mirror(endpoint, resolver.into_link()))
}

#[cfg(not(feature = "live"))]
async fn attach_mirror(targets: LogTargets, config: &Config) -> Result<LogTargets, LogError> {
    if config.mirror.is_some() {
        warn!("Built without the `live` feature, ignoring [mirror]");
    }
    Ok(targets)
}

#[cfg(feature = "live")]
async fn resolve(interface: &str, target: &str) -> Result<(), LogError> {
    use std::time::Duration;
    use tracesynth::error_handling::types::ResolveError;
    use tracesynth::mirror::pcap_link::PcapLink;
    use tracesynth::mirror::{resolve_detached, MirrorResolver};

    let link = PcapLink::open(interface).map_err(ResolveError::Interface)?;
    let (endpoint, _) = resolve_detached(
        MirrorResolver::new(link),
        target.to_string(),
        Duration::from_secs(60),
    )
    .await?;
    println!("{} is at {}", endpoint.target_ip, endpoint.target_hw_addr);
    Ok(())
}

#[cfg(not(feature = "live"))]
async fn resolve(interface: &str, target: &str) -> Result<(), LogError> {
    use tracesynth::error_handling::types::{NetworkError, ResolveError};

    Err(ResolveError::Interface(NetworkError::InterfaceNotFound(format!(
        "cannot resolve {} on {}: built without the `live` feature",
        target, interface
    )))
    .into())
}
