use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// wg-peers - manage device peers of a local WireGuard server
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// format output as json
    #[arg(long, global = true)]
    pub json: bool,

    /// only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// more log output, repeat for trace level
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// base log level or filter directive
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// append logs to this file instead of stderr
    #[arg(long, global = true, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// print the full error chain on failure
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show interface status, free disk space and memory usage
    #[command()]
    Status,

    /// List registered devices
    #[command()]
    List,

    /// Show address and public key of a device
    #[command()]
    Show {
        /// device name
        device: String,
    },

    /// Add a device and generate its client config
    #[command()]
    Add {
        /// device name, letters, digits, '_' and '-' only
        device: String,
    },

    /// Remove a device and delete its client config
    #[command()]
    Remove {
        /// device name
        device: String,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
