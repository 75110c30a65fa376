mod commands;
mod wiring;

use std::path::PathBuf;

use authkeys_core::{default_config_path, load_config_from_file};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{check, init, keys};

#[derive(Debug, Parser)]
#[command(name = "authkeys", version, about = "Resolve authorized SSH keys for a user")]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (default: $AUTHKEYS_CONFIG or /etc/authkeys/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the authorized keys for USER, one per line (sshd AuthorizedKeysCommand)
    Keys { user: String },
    /// Validate the configuration and exercise every configured provider
    Check,
    /// Write an example configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
}

pub const LOG_ENV: &str = "AUTHKEYS_LOG";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Init { force } => init::cmd_init(&config_path, force, cli.json),
        Commands::Keys { user } => {
            let config = load_config_from_file(&config_path)?;
            keys::cmd_keys(&config, &user)
        }
        Commands::Check => {
            let config = load_config_from_file(&config_path)?;
            check::cmd_check(&config, cli.json)
        }
    }
}

/// Diagnostics go to stderr; stdout carries only keys and reports.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn pout(json_mode: bool, value: &serde_json::Value, text: &str) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}
