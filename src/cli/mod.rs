//! Command-line interface definitions.

pub mod check;
pub mod output;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::app::Overrides;

/// Loyalty accrual reconciliation engine.
#[derive(Parser, Debug)]
#[command(name = "loyalty")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine until interrupted
    Run(RunArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `loyalty check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
    /// Check an order number against the mod-10 checksum
    Number(NumberArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Argument for `loyalty check number`.
#[derive(Parser, Debug)]
pub struct NumberArg {
    /// Order number to check
    pub number: String,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep everything in memory instead of opening the database
    #[arg(long)]
    pub in_memory: bool,

    /// Database URI (env: DATABASE_URI)
    #[arg(short = 'd', long)]
    pub database_uri: Option<String>,

    /// Accrual service address (env: ACCRUAL_SYSTEM_ADDRESS)
    #[arg(short = 'r', long)]
    pub accrual_address: Option<String>,

    /// Number of poll workers (env: COUNT_PROCESS)
    #[arg(short = 'p', long)]
    pub poll_workers: Option<usize>,

    /// Job queue capacity (env: BUFFER_SIZE)
    #[arg(short = 'b', long)]
    pub buffer_size: Option<usize>,

    /// Accrual request timeout in seconds (env: TIMEOUT_REQUEST)
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

impl RunArgs {
    /// Flag values as a configuration layer.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            database_uri: self.database_uri.clone(),
            accrual_address: self.accrual_address.clone(),
            poll_workers: self.poll_workers,
            buffer_size: self.buffer_size,
            request_timeout_secs: self.timeout,
        }
    }
}
