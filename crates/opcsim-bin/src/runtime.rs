// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server runtime orchestration.
//!
//! The runtime plays the part of the generic server process: it owns an
//! [`InMemoryHost`], hands it to the [`SampleNodeManager`] through a
//! [`ServerContext`], drives the startup and shutdown signals and waits for
//! an OS signal, a client shutdown request or the optional run duration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use opcsim_config::OpcsimConfig;
use opcsim_core::{
    InMemoryHost, NodeManager, SampleNodeManager, ServerContext, ServerKind, ShutdownReport,
};

use crate::error::{BinError, BinResult};
use crate::shutdown::{ShutdownCause, ShutdownCoordinator};

// =============================================================================
// ServerRuntime
// =============================================================================

/// Runs the sample node manager against the in-process host.
pub struct ServerRuntime {
    config: Arc<OpcsimConfig>,
    shutdown: ShutdownCoordinator,
    run_for: Option<Duration>,
    status_interval: Duration,
}

impl ServerRuntime {
    /// Creates a new runtime.
    pub fn new(config: OpcsimConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
            run_for: None,
            status_interval: Duration::from_secs(30),
        }
    }

    /// Stops the runtime after `duration`.
    pub fn with_run_for(mut self, duration: Option<Duration>) -> Self {
        self.run_for = duration;
        self
    }

    /// Sets the period of the status log line.
    pub fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval.max(Duration::from_secs(1));
        self
    }

    /// Returns the shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Runs until shutdown is signaled and returns the worker report.
    pub async fn run(self) -> BinResult<ShutdownReport> {
        info!("Starting opcsim v{}", opcsim_core::VERSION);

        let (host, manager) = self.initialize()?;
        let manager = Arc::new(manager);

        manager
            .on_startup_signal(&std::env::args().collect::<Vec<_>>().join(" "))
            .map_err(|e| BinError::from(e).with_context("Startup signal rejected"))?;
        manager
            .on_create_server_items()
            .map_err(|e| BinError::from(e).with_context("Address space creation failed"))?;

        self.run_main_loop(&host, &manager).await?;

        info!("Stopping background workers...");
        let worker = Arc::clone(&manager);
        tokio::task::spawn_blocking(move || worker.on_shutdown_signal())
            .await
            .map_err(|e| BinError::runtime(format!("Shutdown task failed: {}", e)))??;

        let report = manager
            .last_shutdown()
            .ok_or_else(|| BinError::runtime("Shutdown produced no report"))?;
        if report.is_clean() {
            info!(elapsed_ms = report.elapsed.as_millis() as u64, "opcsim shutdown complete");
        } else {
            error!(
                builder = ?report.builder,
                refresher = ?report.refresher,
                "Workers did not stop within their grace periods"
            );
        }
        Ok(report)
    }

    fn initialize(&self) -> BinResult<(Arc<InMemoryHost>, SampleNodeManager)> {
        let parameters = self.config.server_parameters();
        let host = InMemoryHost::shared(parameters.branch_delimiter);

        let trigger = self.shutdown.clone();
        host.set_shutdown_handler(move |reason| {
            trigger.trigger(ShutdownCause::PluginRequest(reason.to_string()));
        });

        let ctx = Arc::new(ServerContext::new(host.clone(), parameters));
        let manager = SampleNodeManager::new(
            ctx,
            self.config.lifecycle_config(),
            self.config.sample_config(),
        )
        .map_err(|e| BinError::startup(format!("Failed to create node manager: {}", e)))?;

        match manager.on_get_server_definition(ServerKind::DataAccess) {
            Some(definition) => info!(
                prog_id = %definition.prog_id,
                name = %definition.friendly_name,
                vendor = %definition.vendor_name,
                "Data access server registered"
            ),
            None => warn!("Node manager provides no data access server definition"),
        }
        let parameters = manager.on_get_server_parameters();
        info!(
            update_period_ms = parameters.update_period_ms,
            delimiter = %parameters.branch_delimiter,
            browse_mode = ?parameters.browse_mode,
            "Server parameters"
        );

        Ok((host, manager))
    }

    async fn run_main_loop(&self, host: &InMemoryHost, manager: &SampleNodeManager) -> BinResult<()> {
        let deadline = async {
            match self.run_for {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let mut status = tokio::time::interval(self.status_interval);
        status.tick().await;

        let wait = self.shutdown.wait();
        tokio::pin!(wait);

        info!("opcsim is ready");
        loop {
            tokio::select! {
                cause = &mut wait => {
                    let cause = cause?;
                    info!(cause = %cause, "Leaving main loop");
                    break;
                }
                _ = &mut deadline => {
                    self.shutdown.trigger(ShutdownCause::RunDurationElapsed);
                    break;
                }
                _ = status.tick() => log_status(host, manager),
            }
        }
        Ok(())
    }
}

fn log_status(host: &InMemoryHost, manager: &SampleNodeManager) {
    let metrics = manager.lifecycle().metrics();
    let events = host.events().stats();
    info!(
        state = %host.server_state(),
        items = host.catalog().len(),
        ticks = metrics.ticks,
        values_pushed = metrics.values_pushed,
        tick_errors = metrics.tick_errors,
        events = events.events_generated,
        "Status"
    );
}

// =============================================================================
// Tests
// =============================================================================
