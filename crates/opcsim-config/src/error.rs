// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors raised while loading and checking an opcsim configuration.
//!
//! Errors fall into three groups. Source errors mean the file could not be
//! read. Decode errors mean the content is not valid for its format.
//! Setting errors mean a value decoded fine but is not acceptable. Setting
//! errors carry the dotted key of the offending value (for example
//! `simulation.tick_ms`), available through [`ConfigError::key`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    // ---- source ----------------------------------------------------------
    /// The configuration file does not exist.
    #[error("configuration file {path} does not exist")]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The file extension names no supported format.
    #[error("unsupported configuration format '{extension}' (expected yaml, yml, toml or json)")]
    UnsupportedFormat {
        /// Offending extension.
        extension: String,
    },

    // ---- decode ----------------------------------------------------------
    /// Content that did not come from a file failed to decode.
    #[error("invalid {format} content: {message}")]
    Decode {
        /// Format name.
        format: &'static str,
        /// Decoder message.
        message: String,
    },

    /// A configuration file failed to decode.
    #[error("{path} is not valid {format}: {message}")]
    Parse {
        /// File being decoded.
        path: PathBuf,
        /// Format name.
        format: &'static str,
        /// Decoder message.
        message: String,
    },

    /// An `OPCSIM_*` override could not be applied.
    #[error("environment override {name} rejected: {message}")]
    InvalidEnvVar {
        /// Variable name including the prefix.
        name: String,
        /// Why the value was rejected.
        message: String,
    },

    // ---- settings --------------------------------------------------------
    /// A setting has an unacceptable value.
    #[error("{key}: {reason}")]
    Validation {
        /// Dotted setting key.
        key: String,
        /// Why the value is unacceptable.
        reason: String,
    },

    /// A numeric setting lies outside its inclusive bounds.
    #[error("{key} = {value} is outside {min}..={max}")]
    OutOfRange {
        /// Dotted setting key.
        key: String,
        /// Configured value.
        value: String,
        /// Smallest accepted value.
        min: String,
        /// Largest accepted value.
        max: String,
    },

    /// The branch delimiter cannot split item names.
    #[error("server.branch_delimiter: {delimiter:?} cannot separate item name segments")]
    Delimiter {
        /// Configured delimiter.
        delimiter: char,
    },
}

impl ConfigError {
    /// Missing file.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Unreadable file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Unknown file extension.
    pub fn unsupported_format(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Decode failure without a file.
    pub fn decode(format: &'static str, message: impl ToString) -> Self {
        Self::Decode {
            format,
            message: message.to_string(),
        }
    }

    /// Attaches the file a decode failure came from. Other errors pass
    /// through untouched.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::Decode { format, message } => Self::Parse {
                path: path.into(),
                format,
                message,
            },
            other => other,
        }
    }

    /// Rejected environment override.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Unacceptable setting.
    pub fn validation(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Setting outside `min..=max`.
    pub fn out_of_range<T: std::fmt::Display>(key: impl Into<String>, value: T, min: T, max: T) -> Self {
        Self::OutOfRange {
            key: key.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Returns the dotted key of the setting at fault, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Validation { key, .. } | Self::OutOfRange { key, .. } => Some(key),
            Self::Delimiter { .. } => Some("server.branch_delimiter"),
            _ => None,
        }
    }

    /// Returns `true` for setting errors.
    pub fn is_validation(&self) -> bool {
        self.key().is_some()
    }

    /// Returns `true` if the file could not be read at all.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::FileNotFound { .. })
    }
}
