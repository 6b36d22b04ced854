//! ruleflow - rule-based state machines
//!
//! Loads machine definitions into a registry and answers transition
//! questions about them from the command line.

mod commands;
mod config;
mod loader;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use ruleflow_core::StateMachineRegistry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ruleflow")]
#[command(about = "Inspect and evaluate rule-based state machines")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "RULEFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of machine definitions (overrides the config file)
    #[arg(short, long)]
    definitions: Option<PathBuf>,

    /// Print JSON instead of formatted text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered state machines
    List,

    /// Show a state machine with its states and rules
    Show {
        /// Machine ID
        id: String,
    },

    /// List rules of a state machine
    Rules {
        /// Machine ID
        id: String,

        /// Only rules leaving this state
        #[arg(short, long)]
        state: Option<String>,
    },

    /// List target states reachable from a state, in evaluation order
    Transitions {
        /// Machine ID
        id: String,

        /// Source state
        state: String,
    },

    /// Check whether a manual transition is allowed
    Check {
        /// Machine ID
        id: String,

        /// Current state
        from: String,

        /// Requested state
        to: String,
    },

    /// Compute the automatic next state of an entity
    Next {
        /// Machine ID
        id: String,

        /// Current state of the entity
        #[arg(short, long)]
        state: String,

        /// Entity name
        #[arg(short, long)]
        name: Option<String>,

        /// Creation time (RFC 3339, defaults to now)
        #[arg(long)]
        created_at: Option<DateTime<Utc>>,

        /// Last update time (RFC 3339)
        #[arg(long)]
        updated_at: Option<DateTime<Utc>>,
    },

    /// Validate a definition file without registering it
    Validate {
        /// JSON or YAML definition
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.definitions {
        config.machines.definitions_dir = Some(dir);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let registry = StateMachineRegistry::new()?;
    if let Some(ref dir) = config.machines.definitions_dir {
        let loaded = loader::load_directory(&registry, dir, config.machines.replace_existing)?;
        tracing::debug!("Loaded {} definition(s) from {}", loaded.len(), dir.display());
    }

    match commands::execute(&registry, cli.command, cli.json) {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
