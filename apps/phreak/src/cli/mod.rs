//! # Phreak CLI Module
//!
//! ## Available Commands
//!
//! - `check` - Validate a network and count its segments
//! - `segments` - Show every segment memory after an optional script
//! - `run` - Replay a script and show link events and rule paths
//! - `paths` - Show the segments on one or all rule paths

mod commands;

use crate::config::{Config, Settings};
use crate::error::AppError;
use crate::report::Report;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Phreak segment inspector
///
/// Loads a rule network, replays fact operations against a fresh session
/// and reports which segments and rules are linked.
#[derive(Parser, Debug)]
#[command(name = "phreak")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress the banner
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to ./phreak.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Network definition (TOML or JSON)
    #[arg(short, long, global = true)]
    pub network: Option<PathBuf>,

    /// Operation script (TOML or JSON)
    #[arg(short, long, global = true)]
    pub script: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Validate the network and build every segment
    Check,

    /// Show segment memories
    Segments,

    /// Replay the script and report link events
    Run,

    /// Show rule paths
    Paths {
        /// Only this rule
        #[arg(short, long)]
        rule: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve settings, run the command and print its report.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = Config::discover(cli.config.as_deref(), &cwd)?;
    let settings = Settings::resolve(cli.network, cli.script, cli.json_mode, config)?;

    let report = dispatch(cli.command.as_ref(), &settings)?;
    print_report(&report, settings.json)
}

/// Run a command against resolved settings.
pub fn dispatch(command: Option<&Commands>, settings: &Settings) -> Result<Report, AppError> {
    match command {
        Some(Commands::Check) | None => cmd_check(settings),
        Some(Commands::Segments) => cmd_segments(settings),
        Some(Commands::Run) => cmd_run(settings),
        Some(Commands::Paths { rule }) => cmd_paths(settings, rule.as_deref()),
    }
}
