//! Latchkey door controller.
//!
//! ```text
//! latchkey provision --device-id lab-door
//! latchkey run --reader stdin
//! latchkey cards
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// RFID door controller with a local card cache and a remote authority
#[derive(Parser)]
#[command(name = "latchkey")]
#[command(version)]
struct Cli {
    /// Configuration file (default: latchkey.{json,toml,yaml} if present)
    #[arg(short, long, global = true, env = "LATCHKEY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the door control loop until Ctrl-C or the reader goes away
    Run {
        /// Where card codes come from
        #[arg(long, value_enum, default_value_t = ReaderKind::Stdin)]
        reader: ReaderKind,

        /// Serial device of the RDM6300 reader
        #[arg(long, default_value = "/dev/ttyUSB0")]
        port: String,
    },

    /// Write the device configuration file
    Provision {
        /// Identity sent to the remote authority with every check
        #[arg(long)]
        device_id: String,

        /// Base URL of the access check endpoint
        #[arg(long)]
        authority_url: Option<String>,
    },

    /// List cached cards with their age
    Cards,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReaderKind {
    /// One hex code per line on standard input
    Stdin,
    /// RDM6300 on a serial port
    Serial,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "latchkey=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Command::Run { reader, port } => commands::run(config, reader, &port).await,
        Command::Provision {
            device_id,
            authority_url,
        } => commands::provision(config, &device_id, authority_url),
        Command::Cards => commands::cards(config).await,
    }
}
