// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Runs a sample node manager against an in-memory host with setup and
//! teardown handled.
//!
//! ## Design Principles
//!
//! - Automatic resource management: workers stop when the harness drops
//! - Fast timings by default so suites stay quick

use std::sync::Arc;
use std::time::Duration;

use opcsim_core::{
    HostCallbacks, InMemoryHost, NodeManager, OpcResult, SampleNodeManager, ServerState,
    ShutdownReport,
};

use tracing::{debug, warn};

use super::assertions::wait_for;
use super::builders::SampleServerBuilder;
use super::init_test_logging;

/// Default wait for the builder to publish `Running`.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(20);

// =============================================================================
// ServerHarness
// =============================================================================

/// A started sample server.
#[derive(Debug)]
pub struct ServerHarness {
    host: Arc<InMemoryHost>,
    manager: SampleNodeManager,
    stopped: bool,
}

impl ServerHarness {
    /// Builds and starts a sample server.
    pub fn start(builder: SampleServerBuilder) -> OpcResult<Self> {
        init_test_logging();
        let (host, manager) = builder.build();
        manager.on_startup_signal("opcsim-tests")?;
        manager.on_create_server_items()?;
        debug!(
            delimiter = %manager.context().delimiter(),
            "Test server started"
        );
        Ok(Self {
            host,
            manager,
            stopped: false,
        })
    }

    /// Starts a sample server with the default builder.
    pub fn start_default() -> OpcResult<Self> {
        Self::start(SampleServerBuilder::new())
    }

    /// Returns the host.
    pub fn host(&self) -> &Arc<InMemoryHost> {
        &self.host
    }

    /// Returns the node manager.
    pub fn manager(&self) -> &SampleNodeManager {
        &self.manager
    }

    /// Waits until the server publishes `Running`.
    pub fn wait_running(&self) -> bool {
        self.wait_state(ServerState::Running, DEFAULT_STARTUP_TIMEOUT)
    }

    /// Waits until the host reports `state`.
    pub fn wait_state(&self, state: ServerState, timeout: Duration) -> bool {
        let reached = wait_for(|| self.host.server_state() == state, timeout);
        if !reached {
            warn!(
                expected = %state,
                actual = %self.host.server_state(),
                ?timeout,
                "Server state not reached"
            );
        }
        reached
    }

    /// Looks up an item handle by name.
    pub fn handle(&self, name: &str) -> Option<opcsim_core::ItemHandle> {
        self.host.catalog().find(name)
    }

    /// Stops the workers and returns the report.
    pub fn shutdown(&mut self) -> ShutdownReport {
        self.stopped = true;
        if let Err(e) = self.manager.on_shutdown_signal() {
            panic!("Shutdown signal failed: {}", e);
        }
        let report = self
            .manager
            .last_shutdown()
            .unwrap_or_else(|| panic!("Shutdown produced no report"));
        debug!(?report, "Test server stopped");
        report
    }

    /// Returns the host as the gateway trait object.
    pub fn callbacks(&self) -> Arc<dyn HostCallbacks> {
        self.host.clone()
    }
}

impl Drop for ServerHarness {
    fn drop(&mut self) {
        if !self.stopped {
            let _ = self.manager.on_shutdown_signal();
        }
    }
}
