//! CLI module for profile-variables
//!
//! Argument parsing and subcommand dispatch for replaying runs through the
//! variable audit recorder.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// profile-variables - track variable values across a run
///
/// Replays a recorded run through the profile_variables callback and prints
/// the resulting audit document.
#[derive(Parser, Debug, Clone)]
#[command(name = "profile-variables")]
#[command(author = "Rustible Contributors")]
#[command(version)]
#[command(about = "Track variable values across a run", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a profile_variables configuration file
    #[arg(short = 'c', long, global = true, env = "PROFILE_VARIABLES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ignore /etc, home and working directory configuration files
    #[arg(long, global = true)]
    pub no_default_config: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Replay a run fixture and print the variable audit
    Replay(commands::replay::ReplayArgs),

    /// Show the effective callback configuration
    Config(commands::config::ConfigArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}
