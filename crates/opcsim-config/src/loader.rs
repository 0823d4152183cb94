// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading and processing for opcsim.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders
//! 3. Parse into [`OpcsimConfig`]
//! 4. Apply `OPCSIM_*` environment overrides
//! 5. Resolve a relative log file path against the config directory
//! 6. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! OPCSIM_UPDATE_PERIOD_MS=500
//! OPCSIM_BROWSE_MODE=custom
//! OPCSIM_TICK_MS=100
//! OPCSIM_MASS_ITEM_GROUPS=0
//! OPCSIM_SEED=42
//! OPCSIM_LOG_LEVEL=debug
//! OPCSIM_LOG_FORMAT=json
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, OpcsimConfig};
use opcsim_core::{BrowseMode, LogLevel};
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader for opcsim.
///
/// # Examples
///
/// ```no_run
/// use opcsim_config::loader::ConfigLoader;
///
/// let loader = ConfigLoader::new();
/// let config = loader.load("opcsim.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for resolving relative paths.
    base_path: Option<PathBuf>,

    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve environment variables.
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a new configuration loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: "OPCSIM".to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the base path for resolving relative paths.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<OpcsimConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let format = ConfigFormat::from_path(path)?;

        let content = self.maybe_resolve_placeholders(&content);
        let mut config: OpcsimConfig = parse_str(&content, format).map_err(|e| e.in_file(path))?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }
        resolve_relative_paths(&mut config, &base_path);
        config.validate()?;

        debug!(
            browse_mode = ?config.server.browse_mode,
            tick_ms = config.simulation.tick_ms,
            mass_item_groups = config.simulation.mass_item_groups,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<OpcsimConfig> {
        let content = self.maybe_resolve_placeholders(content);
        let mut config: OpcsimConfig = parse_str(&content, format)?;
        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn maybe_resolve_placeholders(&self, content: &str) -> String {
        if self.resolve_env_vars {
            resolve_env_placeholders(content)
        } else {
            content.to_string()
        }
    }

    fn env_name(&self, key: &str) -> String {
        format!("{}_{}", self.env_prefix, key)
    }

    fn env_parse<T: FromStr>(&self, key: &str, expected: &str) -> ConfigResult<Option<T>> {
        let name = self.env_name(key);
        match env::var(&name) {
            Ok(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::invalid_env_var(name, format!("expected {}", expected))),
            Err(_) => Ok(None),
        }
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&self, config: &mut OpcsimConfig) -> ConfigResult<()> {
        if let Some(period) = self.env_parse("UPDATE_PERIOD_MS", "a number of milliseconds")? {
            config.server.update_period_ms = period;
        }
        if let Ok(value) = env::var(self.env_name("BROWSE_MODE")) {
            config.server.browse_mode = parse_browse_mode(&value).ok_or_else(|| {
                ConfigError::invalid_env_var(self.env_name("BROWSE_MODE"), "expected generic or custom")
            })?;
        }
        if let Some(tick) = self.env_parse("TICK_MS", "a number of milliseconds")? {
            config.simulation.tick_ms = tick;
        }
        if let Some(groups) = self.env_parse("MASS_ITEM_GROUPS", "a block count")? {
            config.simulation.mass_item_groups = groups;
        }
        if let Some(seed) = self.env_parse("SEED", "an unsigned integer")? {
            config.simulation.seed = Some(seed);
        }
        if let Ok(value) = env::var(self.env_name("EVENT_SPACE")) {
            config.simulation.event_space = parse_bool(&value);
        }
        if let Ok(value) = env::var(self.env_name("LOG_LEVEL")) {
            match parse_log_level(&value) {
                Some(level) => config.logging.level = level,
                None => warn!("Ignoring unknown log level '{}'", value),
            }
        }
        if let Ok(value) = env::var(self.env_name("LOG_FORMAT")) {
            match parse_log_format(&value) {
                Some(format) => config.logging.format = format,
                None => warn!("Ignoring unknown log format '{}'", value),
            }
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    let decode = |e: &dyn std::fmt::Display| ConfigError::decode(format.extension(), e);
    match format {
        ConfigFormat::Yaml => config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| decode(&e)),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| decode(&e)),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| decode(&e)),
    }
}

/// Substitutes `${NAME}` and `${NAME:default}` with environment values.
///
/// An unset variable without a default, or a `${` with no closing brace, is
/// copied through unchanged.
pub fn resolve_env_placeholders(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let body = &rest[open + 2..];
        let Some(close) = body.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let (name, default) = match body[..close].split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (&body[..close], None),
        };
        match (env::var(name), default) {
            (Ok(value), _) => out.push_str(&value),
            (Err(_), Some(default)) => out.push_str(default),
            (Err(_), None) => {
                warn!(variable = name, "Placeholder left unresolved");
                out.push_str(&rest[open..open + close + 3]);
            }
        }
        rest = &body[close + 1..];
    }

    out.push_str(rest);
    out
}

fn resolve_relative_paths(config: &mut OpcsimConfig, base_path: &Path) {
    if let Some(ref mut log_file) = config.logging.file {
        if log_file.is_relative() {
            *log_file = base_path.join(&log_file);
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Parses a log level name.
pub fn parse_log_level(value: &str) -> Option<LogLevel> {
    match value.to_lowercase().as_str() {
        "trace" => Some(LogLevel::Trace),
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" | "warning" => Some(LogLevel::Warning),
        "error" => Some(LogLevel::Error),
        "alarm" => Some(LogLevel::Alarm),
        "fatal" => Some(LogLevel::Fatal),
        "off" | "disabled" => Some(LogLevel::Disabled),
        _ => None,
    }
}

/// Parses a log format name.
pub fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value.to_lowercase().as_str() {
        "text" | "pretty" => Some(LogFormat::Text),
        "compact" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

fn parse_browse_mode(value: &str) -> Option<BrowseMode> {
    match value.to_lowercase().as_str() {
        "generic" => Some(BrowseMode::Generic),
        "custom" => Some(BrowseMode::Custom),
        _ => None,
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<OpcsimConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<OpcsimConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================
