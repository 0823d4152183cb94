// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Tracing setup.
//!
//! The plugin reports its level to the host as a [`LogLevel`], which has
//! more steps than `tracing`. [`level_directive`] folds it onto a filter
//! directive. Output goes to stdout and, when `logging.file` is set, is
//! appended to that file as well.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use opcsim_config::LoggingConfig;
use opcsim_core::LogLevel;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::{Cli, LogFormat};
use crate::error::{BinError, BinResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// =============================================================================
// LogSettings
// =============================================================================

/// Effective logging options after command-line overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub directive: String,
    /// Output format.
    pub format: LogFormat,
    /// File that receives a copy of the output.
    pub file: Option<PathBuf>,
    /// Include the event target.
    pub with_target: bool,
    /// Include source file and line.
    pub with_file: bool,
    /// Include thread names.
    pub with_thread_names: bool,
}

impl LogSettings {
    /// Combines the `logging` section with `-l`, `-q`, `-v` and `--log-format`.
    pub fn resolve(cli: &Cli, config: &LoggingConfig) -> Self {
        let directive = cli
            .effective_log_level()
            .unwrap_or_else(|| level_directive(config.level))
            .to_string();
        Self {
            directive,
            format: cli.log_format.unwrap_or_else(|| LogFormat::from(config.format)),
            file: config.file.clone(),
            with_target: config.with_target,
            with_file: config.with_file,
            with_thread_names: config.with_thread_names,
        }
    }

    fn layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(self.with_target)
            .with_file(self.with_file)
            .with_line_number(self.with_file)
            .with_thread_names(self.with_thread_names);
        match self.format {
            LogFormat::Text => layer.boxed(),
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Json => layer.json().with_current_span(true).boxed(),
        }
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over the resolved directive. A second call
/// keeps the first subscriber and only prints a note.
///
/// # Errors
///
/// Returns a startup error if the log file cannot be opened.
pub fn init_logging(settings: &LogSettings) -> BinResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.directive));

    let stdout_ansi = std::io::IsTerminal::is_terminal(&std::io::stdout());
    let mut layers = vec![settings.layer(std::io::stdout, stdout_ansi)];

    if let Some(path) = &settings.file {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                BinError::startup(format!("cannot create log directory {}: {}", dir.display(), e))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| BinError::startup(format!("cannot open log file {}: {}", path.display(), e)))?;
        layers.push(settings.layer(Mutex::new(file), false));
    }

    if let Err(e) = tracing_subscriber::registry().with(layers).with(filter).try_init() {
        eprintln!("opcsim: keeping the existing log subscriber ({})", e);
    }
    Ok(())
}

/// Folds a plugin log level onto a `tracing` filter directive.
pub fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warning => "warn",
        LogLevel::Error | LogLevel::Alarm | LogLevel::Fatal => "error",
        LogLevel::Disabled => "off",
    }
}
