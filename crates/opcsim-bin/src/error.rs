// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Process-level errors and exit codes.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 1 | configuration rejected |
//! | 2 | process could not start |
//! | 3 | failure while serving |
//! | 4 | I/O failure |
//! | 5 | node manager returned an error |
//! | 6 | a worker overran its shutdown grace period |

use opcsim_core::WorkerExit;
use thiserror::Error;

/// Result type alias for the binary.
pub type BinResult<T> = Result<T, BinError>;

/// Errors surfaced by the opcsim binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] opcsim_config::ConfigError),

    /// Something the process needs before serving could not be set up.
    #[error("startup failed: {0}")]
    Startup(String),

    /// Failure while serving.
    #[error("{0}")]
    Runtime(String),

    /// I/O failure outside configuration loading.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The node manager returned an error.
    #[error("node manager: {0}")]
    Plugin(#[from] opcsim_core::OpcError),

    /// At least one worker was detached after its grace period.
    #[error("shutdown overran (builder {builder:?}, refresher {refresher:?})")]
    WorkersOverran {
        /// Builder outcome.
        builder: WorkerExit,
        /// Refresher outcome.
        refresher: WorkerExit,
    },

    /// Another error with a description of what was being attempted.
    #[error("{context}: {source}")]
    WithContext {
        /// What was being attempted.
        context: String,
        /// Underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Startup failure.
    pub fn startup(msg: impl Into<String>) -> Self {
        Self::Startup(msg.into())
    }

    /// Failure while serving.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Wraps the error with what was being attempted.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::Startup(_) => 2,
            Self::Runtime(_) => 3,
            Self::Io(_) => 4,
            Self::Plugin(_) => 5,
            Self::WorkersOverran { .. } => 6,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }

    /// Returns the configuration key at fault, looking through context.
    pub fn setting_key(&self) -> Option<&str> {
        match self {
            Self::Config(e) => e.key(),
            Self::WithContext { source, .. } => source.setting_key(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(format!("{:#}", err))
    }
}

// =============================================================================
// Reporting
// =============================================================================

/// Prints the error and its causes to stderr.
pub fn report_error(error: &BinError) {
    eprintln!("opcsim: {}", error);
    if let Some(key) = error.setting_key() {
        eprintln!("  check setting `{}` or its OPCSIM_* override", key);
    }

    let mut cause = std::error::Error::source(error);
    while let Some(inner) = cause {
        eprintln!("  caused by: {}", inner);
        cause = inner.source();
    }
}

/// Prints the error and exits with its code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}
