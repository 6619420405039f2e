//! # quakewire
//!
//! CLI harness for the quakewire EEW relay.
//!
//! ## Commands
//!
//! - `run`: Replay a scenario file through a full node
//! - `distance`: Great-circle distance between two points
//! - `role`: Relay role for a battery level
//! - `check-config`: Validate a node configuration file
//!
//! ## Example
//!
//! ```bash
//! # Replay three cycles of provider data at 45% battery
//! quakewire run --config demos/node.toml --scenario demos/scenario.json --battery 0.45
//!
//! # Istanbul to Ankara
//! quakewire distance 41.0082,28.9784 39.9334,32.8597
//!
//! quakewire role 0.15
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod scenario;

use commands::{check_config, distance, role, run};

/// CLI harness for the quakewire EEW relay.
#[derive(Parser, Debug)]
#[command(name = "quakewire")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay provider and peer events from a scenario file
    Run {
        /// Node configuration (TOML). Defaults apply when omitted.
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Scenario file (JSON)
        #[arg(long, short)]
        scenario: PathBuf,

        /// Battery level in [0, 1] driving the relay role
        #[arg(long)]
        battery: Option<f64>,

        /// Number of poll cycles (default: as many as the scenario scripts)
        #[arg(long)]
        cycles: Option<u32>,
    },

    /// Great-circle distance between two "lat,lon" points
    Distance {
        /// First point, e.g. 41.0,29.0
        #[arg(allow_hyphen_values = true)]
        from: String,

        /// Second point
        #[arg(allow_hyphen_values = true)]
        to: String,
    },

    /// Relay role for a battery level
    Role {
        /// Battery level in [0, 1]
        #[arg(allow_hyphen_values = true)]
        level: f64,
    },

    /// Load and validate a node configuration file
    CheckConfig {
        /// Path to the TOML file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let init = if cli.json_logs {
        eew_node::logging::init_json(&cli.log_level)
    } else {
        eew_node::logging::init(&cli.log_level)
    };
    init.context("Failed to initialise logging")?;

    match cli.command {
        Commands::Run {
            config,
            scenario,
            battery,
            cycles,
        } => {
            let status = run::run(config.as_deref(), &scenario, battery, cycles).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("Failed to render node status")?
            );
        }
        Commands::Distance { from, to } => {
            println!("{}", distance::run(&from, &to)?);
        }
        Commands::Role { level } => {
            println!("{}", role::run(level)?);
        }
        Commands::CheckConfig { path } => {
            println!("{}", check_config::run(&path)?);
        }
    }

    Ok(())
}
