// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shutdown triggers.
//!
//! The server stops when it receives an OS signal, when a client writes the
//! plugin's shutdown command (the host forwards this through its shutdown
//! handler), or when the configured run duration elapses. The first trigger
//! wins and is recorded as a [`ShutdownCause`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::error::{BinError, BinResult};

/// Why the server is stopping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownCause {
    /// The process received the named signal.
    Signal(&'static str),
    /// The plugin asked the host to shut down.
    PluginRequest(String),
    /// The `--duration` limit was reached.
    RunDurationElapsed,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "received {}", name),
            Self::PluginRequest(reason) => write!(f, "plugin request: {}", reason),
            Self::RunDurationElapsed => f.write_str("run duration elapsed"),
        }
    }
}

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Records the first shutdown trigger and wakes everyone waiting on it.
///
/// Clones share state. A clone can be moved into the host's shutdown
/// handler, which runs on plugin worker threads.
#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    cause: Arc<watch::Sender<Option<ShutdownCause>>>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with no trigger recorded.
    pub fn new() -> Self {
        let (cause, _) = watch::channel(None);
        Self {
            cause: Arc::new(cause),
        }
    }

    /// Records `cause` unless another trigger came first.
    ///
    /// Returns `true` if this call was the first.
    pub fn trigger(&self, cause: ShutdownCause) -> bool {
        self.cause.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            info!(cause = %cause, "Shutdown triggered");
            *current = Some(cause);
            true
        })
    }

    /// Returns the recorded cause, if any.
    pub fn cause(&self) -> Option<ShutdownCause> {
        self.cause.borrow().clone()
    }

    /// Waits for an OS signal or a trigger and returns the winning cause.
    ///
    /// # Errors
    ///
    /// Returns a startup error if a signal handler cannot be installed.
    pub async fn wait(&self) -> BinResult<ShutdownCause> {
        let mut watcher = self.cause.subscribe();
        let recorded = async move {
            loop {
                if let Some(cause) = watcher.borrow_and_update().clone() {
                    return cause;
                }
                // The sender lives in `self`, so this only fails after drop.
                if watcher.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            cause = recorded => Ok(cause),
            signal = next_signal() => {
                self.trigger(ShutdownCause::Signal(signal?));
                self.cause()
                    .ok_or_else(|| BinError::runtime("shutdown cause missing after trigger"))
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn next_signal() -> BinResult<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let install = |kind: SignalKind, name: &str| {
        signal(kind)
            .map_err(|e| BinError::startup(format!("cannot install {} handler: {}", name, e)))
    };
    let mut term = install(SignalKind::terminate(), "SIGTERM")?;
    let mut int = install(SignalKind::interrupt(), "SIGINT")?;
    let mut quit = install(SignalKind::quit(), "SIGQUIT")?;

    Ok(tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = int.recv() => "SIGINT",
        _ = quit.recv() => "SIGQUIT",
    })
}

#[cfg(not(unix))]
async fn next_signal() -> BinResult<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| BinError::startup(format!("cannot install Ctrl+C handler: {}", e)))?;
    Ok("Ctrl+C")
}
