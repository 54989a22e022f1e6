use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use dx_hub::config::{Backpressure, HubConfig};
use dx_hub::echo::{self, EchoHandler};
use dx_hub::hub::{Hub, HubHandle};
use dx_hub::{logging, server};

#[derive(Parser)]
#[command(name = "dx-hub")]
#[command(about = "Real-time request/response hub with unicast and broadcast delivery over WebSockets", version)]
#[command(after_help = "Protocol:
- Clients send {\"id\": \"r1\", \"type\": \"ACTION\", \"action\": \"ping\"} as text frames
- STATUS replies echo the request id, UNICAST replies go to the sender only
- BROADCAST replies go to every connected client

Demo actions: ping, echo {text}, say {text, from}, tick")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the hub server
    Serve {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen address, overrides the configuration file
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Drop responses for slow clients instead of waiting for them
        #[arg(long)]
        drop_slow: bool,

        /// Broadcast a tick every N seconds
        #[arg(long, value_name = "SECS")]
        heartbeat: Option<u64>,

        /// Log filter used when RUST_LOG is unset
        #[arg(long, value_name = "LEVEL")]
        log_level: Option<String>,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig { file: PathBuf },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(cmd) => cmd,
        None => Commands::Serve {
            config: None,
            bind: None,
            drop_slow: false,
            heartbeat: None,
            log_level: None,
        },
    };

    match command {
        Commands::Serve {
            config,
            bind,
            drop_slow,
            heartbeat,
            log_level,
        } => {
            logging::init(log_level.as_deref());

            let mut config = match config {
                Some(path) => HubConfig::load(&path)?,
                None => HubConfig::default(),
            };
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if drop_slow {
                config.backpressure = Backpressure::DropNewest;
            }

            let hub = Hub::spawn(EchoHandler::default(), echo::actions()?, &config);
            if let Some(secs) = heartbeat.filter(|s| *s > 0) {
                tokio::spawn(heartbeat_loop(hub.clone(), Duration::from_secs(secs)));
            }

            println!(
                "{} Hub listening at {}",
                "✓".green(),
                format!("ws://{}{}", config.bind, config.ws_path).bright_blue()
            );

            tokio::select! {
                result = server::start(config, hub) => result?,
                signal = tokio::signal::ctrl_c() => {
                    signal.context("failed to listen for shutdown signal")?;
                    println!("{}", "Shutting down".yellow());
                }
            }
        }

        Commands::CheckConfig { file } => {
            let config = HubConfig::load(&file)?;
            println!("{} {} is valid", "✓".green(), file.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn heartbeat_loop(hub: HubHandle, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    let mut sequence = 0u64;
    loop {
        interval.tick().await;
        sequence += 1;
        if hub.inject(echo::tick_request(sequence)).await.is_err() {
            tracing::warn!("hub stopped, ending heartbeat");
            break;
        }
    }
}
