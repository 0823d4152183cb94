// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcsim-config
//!
//! Configuration management for the opcsim server plugin.
//!
//! ## Features
//!
//! - **Schema Definition**: Typed sections with defaults and validation
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: `OPCSIM_*` variables override file values
//!
//! ## Quick Start
//!
//! ```no_run
//! use opcsim_config::loader::load_config;
//!
//! let config = load_config("opcsim.yaml").unwrap();
//! println!("Tick: {} ms", config.simulation.tick_ms);
//! ```
//!
//! ## Configuration Schema
//!
//! - `server` - Update period, branch delimiter and browse mode
//! - `simulation` - Tick, mass items, event space and random seed
//! - `lifecycle` - Shutdown grace periods
//! - `logging` - Logging configuration
//!
//! Values in config files can reference environment variables:
//!
//! ```yaml
//! simulation:
//!   tick_ms: ${OPCSIM_TICK:200}
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader};
pub use schema::{
    LifecycleConfig, LogFormat, LoggingConfig, OpcsimConfig, ServerConfig, SimulationConfig,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
