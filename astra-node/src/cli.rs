use clap::{Parser, Subcommand};

use astra_relay::host::RelayHost;
use astra_relay::relay::keypair_from_seed;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::signal::shutdown_signal;
use crate::supervisor::Supervisor;

#[derive(Parser)]
#[command(
    name = "astra-relay",
    about = "Astra Relay — libp2p node offering circuit relay v2",
    version
)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the relay node (default)
    Run {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<String>,
        /// Listen multiaddr, replaces the configured ones (can be specified multiple times)
        #[arg(long = "listen")]
        listen_addrs: Vec<String>,
        /// Extra multiaddr to advertise, e.g. "/ip4/203.0.113.7/tcp/40001"
        /// (can be specified multiple times)
        #[arg(long = "announce")]
        announce_addrs: Vec<String>,
        /// Hex-encoded 32-byte seed for a deterministic peer id
        #[arg(long)]
        keypair_seed: Option<String>,
        /// Run without offering the relay service
        #[arg(long)]
        no_relay: bool,
    },
    /// Generate a keypair seed and print the peer id it yields
    Keygen,
}

pub async fn run(cli: Cli) -> Result<(), NodeError> {
    let command = cli.command.unwrap_or(Command::Run {
        config: None,
        listen_addrs: Vec::new(),
        announce_addrs: Vec::new(),
        keypair_seed: None,
        no_relay: false,
    });

    match command {
        Command::Run {
            config,
            listen_addrs,
            announce_addrs,
            keypair_seed,
            no_relay,
        } => {
            crate::banner::print_banner();

            let mut config = match config {
                Some(path) => NodeConfig::load(&path)?,
                None => NodeConfig::default(),
            };

            // Apply CLI overrides.
            if !listen_addrs.is_empty() {
                config.network.listen_addrs = listen_addrs;
            }
            config.network.announce_addrs.extend(announce_addrs);
            if let Some(seed) = keypair_seed {
                config.network.keypair_seed = Some(seed);
            }
            if no_relay {
                config.relay.enabled = false;
            }

            let mut supervisor = Supervisor::start(&config).await?;
            print_summary(&config, &supervisor);
            supervisor.run(shutdown_signal()).await
        }
        Command::Keygen => {
            let seed: [u8; 32] = rand::random();
            let keypair = keypair_from_seed(Some(&seed))?;
            println!("Keypair seed: {}", hex::encode(seed));
            println!("Peer id: {}", keypair.public().to_peer_id());
            Ok(())
        }
    }
}

/// Print compact startup summary.
fn print_summary<H: RelayHost>(config: &NodeConfig, supervisor: &Supervisor<H>) {
    let dim = console::Style::new().dim();
    let cyan = console::Style::new().cyan();
    let host = supervisor.host();

    println!("  {} {}", dim.apply_to("Peer id "), cyan.apply_to(host.peer_id()));
    for addr in host.listen_addrs() {
        println!("  {} {}", dim.apply_to("Listen  "), cyan.apply_to(addr));
    }
    let relay = if config.relay.enabled {
        format!(
            "relay · {} reservations · {} circuits",
            config.relay.max_reservations, config.relay.max_circuits
        )
    } else {
        "no relay".to_string()
    };
    println!("  {} {}", dim.apply_to("Mode    "), cyan.apply_to(relay));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["astra-relay"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "astra-relay",
            "--log-level",
            "debug",
            "run",
            "--listen",
            "/ip4/0.0.0.0/tcp/40001",
            "--listen",
            "/ip4/0.0.0.0/tcp/40002",
            "--announce",
            "/ip4/203.0.113.7/tcp/40001",
            "--no-relay",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Some(Command::Run {
                listen_addrs,
                announce_addrs,
                no_relay,
                config,
                ..
            }) => {
                assert_eq!(listen_addrs.len(), 2);
                assert_eq!(announce_addrs, vec!["/ip4/203.0.113.7/tcp/40001"]);
                assert!(no_relay);
                assert!(config.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_keygen_parses() {
        let cli = Cli::try_parse_from(["astra-relay", "keygen"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Keygen)));
    }
}
