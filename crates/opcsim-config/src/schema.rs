// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for opcsim.
//!
//! # Schema Structure
//!
//! ```text
//! OpcsimConfig
//! ├── server: ServerConfig
//! ├── simulation: SimulationConfig
//! ├── lifecycle: LifecycleConfig
//! └── logging: LoggingConfig
//! ```
//!
//! Every section has defaults, so an empty document is a valid
//! configuration.

use crate::error::{ConfigError, ConfigResult};
use opcsim_core::{BrowseMode, LogLevel, SampleConfig, ServerParameters};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default cache update period in milliseconds.
pub const DEFAULT_UPDATE_PERIOD_MS: u32 = 200;

/// Maximum cache update period in milliseconds (1 hour).
pub const MAX_UPDATE_PERIOD_MS: u32 = 3_600_000;

/// Default refresher tick in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 200;

/// Maximum refresher tick in milliseconds (1 minute).
pub const MAX_TICK_MS: u64 = 60_000;

/// Default number of mass item blocks.
pub const DEFAULT_MASS_ITEM_GROUPS: usize = 100;

/// Upper bound on mass item blocks.
pub const MAX_MASS_ITEM_GROUPS: usize = 10_000;

/// Default builder grace period in milliseconds.
pub const DEFAULT_BUILDER_GRACE_MS: u64 = 10_000;

/// Default refresher grace period in milliseconds.
pub const DEFAULT_REFRESHER_GRACE_MS: u64 = 30_000;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for opcsim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpcsimConfig {
    /// Parameters reported to the host.
    #[serde(default)]
    pub server: ServerConfig,

    /// Simulated address space.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Worker timing.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OpcsimConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.simulation.validate()?;
        self.lifecycle.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Returns the parameters handed to the host.
    pub fn server_parameters(&self) -> ServerParameters {
        ServerParameters::default()
            .with_update_period_ms(self.server.update_period_ms)
            .with_delimiter(self.server.branch_delimiter)
            .with_browse_mode(self.server.browse_mode)
    }

    /// Returns the worker timing.
    pub fn lifecycle_config(&self) -> opcsim_core::LifecycleConfig {
        opcsim_core::LifecycleConfig::default()
            .with_tick(self.simulation.tick())
            .with_grace(
                Duration::from_millis(self.lifecycle.builder_grace_ms),
                Duration::from_millis(self.lifecycle.refresher_grace_ms),
            )
    }

    /// Returns the options of the sample address space.
    pub fn sample_config(&self) -> SampleConfig {
        SampleConfig {
            mass_item_groups: self.simulation.mass_item_groups,
            mass_item_delay: Duration::from_millis(self.simulation.mass_item_delay_ms),
            event_space: self.simulation.event_space,
            seed: self.simulation.seed,
            log_level: self.logging.level,
            log_path: self
                .logging
                .file
                .as_ref()
                .and_then(|p| p.parent())
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Parameters the plugin reports to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Cache update period in milliseconds.
    #[serde(default = "default_update_period")]
    pub update_period_ms: u32,

    /// Delimiter between name segments.
    #[serde(default = "default_delimiter")]
    pub branch_delimiter: char,

    /// Who serves hierarchical browsing.
    #[serde(default)]
    pub browse_mode: BrowseMode,
}

fn default_update_period() -> u32 {
    DEFAULT_UPDATE_PERIOD_MS
}

fn default_delimiter() -> char {
    '.'
}

impl ServerConfig {
    /// Validates the server configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.update_period_ms == 0 || self.update_period_ms > MAX_UPDATE_PERIOD_MS {
            return Err(ConfigError::out_of_range(
                "server.update_period_ms",
                self.update_period_ms,
                1,
                MAX_UPDATE_PERIOD_MS,
            ));
        }
        if self.branch_delimiter.is_whitespace() || self.branch_delimiter.is_alphanumeric() {
            return Err(ConfigError::Delimiter {
                delimiter: self.branch_delimiter,
            });
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            update_period_ms: default_update_period(),
            branch_delimiter: default_delimiter(),
            browse_mode: BrowseMode::default(),
        }
    }
}

// =============================================================================
// Simulation Configuration
// =============================================================================

/// Simulated address space settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Refresher tick in milliseconds.
    #[serde(default = "default_tick")]
    pub tick_ms: u64,

    /// Number of mass item blocks.
    #[serde(default = "default_mass_item_groups")]
    pub mass_item_groups: usize,

    /// Pause after each mass item block in milliseconds.
    #[serde(default = "default_mass_item_delay")]
    pub mass_item_delay_ms: u64,

    /// Build the sample event space.
    #[serde(default = "default_enabled")]
    pub event_space: bool,

    /// Fixed random seed.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_tick() -> u64 {
    DEFAULT_TICK_MS
}

fn default_mass_item_groups() -> usize {
    DEFAULT_MASS_ITEM_GROUPS
}

fn default_mass_item_delay() -> u64 {
    10
}

fn default_enabled() -> bool {
    true
}

impl SimulationConfig {
    /// Validates the simulation configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tick_ms == 0 || self.tick_ms > MAX_TICK_MS {
            return Err(ConfigError::out_of_range(
                "simulation.tick_ms",
                self.tick_ms,
                1,
                MAX_TICK_MS,
            ));
        }
        if self.mass_item_groups > MAX_MASS_ITEM_GROUPS {
            return Err(ConfigError::out_of_range(
                "simulation.mass_item_groups",
                self.mass_item_groups,
                0,
                MAX_MASS_ITEM_GROUPS,
            ));
        }
        Ok(())
    }

    /// Returns the tick as a duration.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick(),
            mass_item_groups: default_mass_item_groups(),
            mass_item_delay_ms: default_mass_item_delay(),
            event_space: true,
            seed: None,
        }
    }
}

// =============================================================================
// Lifecycle Configuration
// =============================================================================

/// Shutdown grace periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Longest wait for the builder in milliseconds.
    #[serde(default = "default_builder_grace")]
    pub builder_grace_ms: u64,

    /// Longest wait for the refresher in milliseconds.
    #[serde(default = "default_refresher_grace")]
    pub refresher_grace_ms: u64,
}

fn default_builder_grace() -> u64 {
    DEFAULT_BUILDER_GRACE_MS
}

fn default_refresher_grace() -> u64 {
    DEFAULT_REFRESHER_GRACE_MS
}

impl LifecycleConfig {
    /// Validates the lifecycle configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.builder_grace_ms == 0 {
            return Err(ConfigError::validation(
                "lifecycle.builder_grace_ms",
                "grace period must be positive",
            ));
        }
        if self.refresher_grace_ms == 0 {
            return Err(ConfigError::validation(
                "lifecycle.refresher_grace_ms",
                "grace period must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            builder_grace_ms: default_builder_grace(),
            refresher_grace_ms: default_refresher_grace(),
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level, also reported to the host.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,

    /// Log file path (optional).
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Include span targets in logs.
    #[serde(default = "default_enabled")]
    pub with_target: bool,

    /// Include file/line in logs.
    #[serde(default)]
    pub with_file: bool,

    /// Include thread names in logs.
    #[serde(default)]
    pub with_thread_names: bool,
}

impl LoggingConfig {
    /// Validates the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(file) = &self.file {
            if file.as_os_str().is_empty() {
                return Err(ConfigError::validation("logging.file", "path is empty"));
            }
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            file: None,
            with_target: true,
            with_file: false,
            with_thread_names: false,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Compact single-line text.
    Compact,
    /// JSON for log shippers.
    Json,
}

impl LogFormat {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
