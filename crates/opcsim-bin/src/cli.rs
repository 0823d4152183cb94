// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Start the sample server (default)
//! - `validate`: Validate configuration file
//! - `definition`: Show the registration data and server parameters
//! - `browse`: Build the address space and list a branch
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// opcsim - OPC DA/AE sample server plugin
///
/// Runs the sample node manager against an in-process host with a
/// simulated device namespace.
#[derive(Parser, Debug)]
#[command(
    name = "opcsim",
    author = "Sylvex <contact@sylvex.io>",
    version = opcsim_core::VERSION,
    about = "OPC DA/AE sample server plugin with a simulated device namespace",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (defaults apply when omitted)
    #[arg(short, long, env = "OPCSIM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, env = "OPCSIM_CLI_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact); overrides the config file
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the opcsim CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the sample server
    ///
    /// This is the default command when no subcommand is specified.
    /// It builds the address space, refreshes the simulated items and
    /// waits for a termination signal or a client shutdown request.
    Run(RunArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show the server registration data and parameters
    Definition(DefinitionArgs),

    /// Build the address space and list the items below a branch
    Browse(BrowseArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Stop after this many seconds
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Override the number of mass item blocks
    #[arg(long)]
    pub mass_item_groups: Option<usize>,

    /// Serve browsing from the plugin instead of the host
    #[arg(long)]
    pub custom_browse: bool,

    /// Seconds between status log lines
    #[arg(long, default_value = "30")]
    pub status_interval: u64,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `definition` command.
#[derive(Args, Debug, Clone, Default)]
pub struct DefinitionArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `browse` command.
#[derive(Args, Debug, Clone, Default)]
pub struct BrowseArgs {
    /// Branch to list (root when omitted)
    pub branch: Option<String>,

    /// List every leaf below the branch
    #[arg(long)]
    pub flat: bool,

    /// Wildcard name filter (`*`, `?`, `#`)
    #[arg(short = 'p', long)]
    pub pattern: Option<String>,

    /// Number of mass item blocks to build
    #[arg(long, default_value = "1")]
    pub mass_item_groups: usize,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<opcsim_config::LogFormat> for LogFormat {
    fn from(format: opcsim_config::LogFormat) -> Self {
        match format {
            opcsim_config::LogFormat::Text => LogFormat::Text,
            opcsim_config::LogFormat::Json => LogFormat::Json,
            opcsim_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs {
                status_interval: 30,
                ..RunArgs::default()
            }))
    }

    /// Get the effective log level; `None` defers to the config file.
    pub fn effective_log_level(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
