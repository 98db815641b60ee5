mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tandem_relay::{RelayHub, router};
use tandem_session::SessionConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem", version, about = "Synchronized watch sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the signaling and room-record relay.
    Relay {
        #[arg(long, env = "TANDEM_RELAY_BIND", default_value = "0.0.0.0:3000")]
        bind: String,
    },

    /// Run a host and viewers in-process and watch them stay in step.
    Simulate {
        #[arg(long, default_value_t = 3)]
        viewers: usize,

        #[arg(long, default_value_t = 30)]
        seconds: u64,

        /// Drop every change notice so viewers rely on the periodic check.
        #[arg(long)]
        drop_notifications: bool,

        /// Also share a synthetic screen capture over WebRTC.
        #[arg(long)]
        share: bool,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Relay { bind } => {
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;

            info!("Relay listening on ws://{}/rooms/{{room_id}}/ws/{{participant_id}}", bind);
            println!("{} {}", "Relay listening on".green().bold(), bind);

            axum::serve(listener, router(RelayHub::new()))
                .await
                .context("Relay server stopped")?;
        }

        Commands::Simulate {
            viewers,
            seconds,
            drop_notifications,
            share,
            config,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => SessionConfig::default(),
            };

            simulate::run(simulate::Options {
                viewers,
                seconds,
                drop_notifications,
                share,
                config,
            })
            .await?;
        }
    }

    Ok(())
}

fn load_config(path: &PathBuf) -> Result<SessionConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    SessionConfig::from_toml(&source).with_context(|| format!("Invalid config {}", path.display()))
}
