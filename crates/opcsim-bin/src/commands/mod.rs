// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `run`: Start the sample server
//! - `validate`: Validate configuration file
//! - `definition`: Show registration data and parameters
//! - `browse`: List the address space
//! - `version`: Show version information

mod browse;
mod definition;
mod run;
mod validate;
mod version;

pub use browse::browse;
pub use definition::definition;
pub use run::run;
pub use validate::validate;
pub use version::version;

use opcsim_config::{ConfigFormat, ConfigLoader, OpcsimConfig};

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Loads the configuration named on the command line, or the defaults
/// with environment overrides applied when no file is given.
pub fn load_config(cli: &Cli) -> BinResult<OpcsimConfig> {
    let loader = ConfigLoader::new();
    let config = match &cli.config {
        Some(path) => loader.load(path)?,
        None => loader.load_from_str("{}", ConfigFormat::Json)?,
    };
    Ok(config)
}

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli, config: OpcsimConfig) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::run(config, args).await,
        Commands::Validate(args) => validate::validate(&cli, &config, args),
        Commands::Definition(args) => definition::definition(&config, args),
        Commands::Browse(args) => browse::browse(&config, args),
        Commands::Version => version::version(),
    }
}

// =============================================================================
// Tests
// =============================================================================
