// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Background worker lifecycle.
//!
//! The [`LifecycleController`] owns the two long-lived workers:
//!
//! - the **builder** publishes `NoConfig`, runs [`Workload::populate`] once
//!   and publishes `Running`, or `Failed` if population returns an error
//! - the **refresher** calls [`Workload::tick`] once per tick and then waits
//!   on the shared [`CancellationSignal`] for one tick length
//!
//! # Shutdown
//!
//! [`LifecycleController::shutdown`] raises the signal and waits for each
//! worker up to its own grace period, both measured from the start of the
//! shutdown. A worker that overruns is logged at error level and detached;
//! it is never killed. Shutting down twice, or before starting, is a no-op
//! that succeeds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cancel::CancellationSignal;
use crate::context::ServerContext;
use crate::error::{OpcError, OpcResult};
use crate::types::ServerState;

// =============================================================================
// Workload
// =============================================================================

/// Work performed by the two background workers.
pub trait Workload: Send + Sync + 'static {
    /// Populates the catalog and event space.
    ///
    /// Long running population should poll `cancel` and return early once
    /// it is raised.
    fn populate(&self, ctx: &ServerContext, cancel: &CancellationSignal) -> OpcResult<()>;

    /// Refreshes the cache once; `running` is `true` once the server state
    /// is `Running`. Returns the number of values pushed.
    fn tick(&self, ctx: &ServerContext, running: bool) -> OpcResult<usize>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Timing of the background workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Refresher tick length.
    pub tick: Duration,
    /// Longest wait for the builder on shutdown.
    pub builder_grace: Duration,
    /// Longest wait for the refresher on shutdown.
    pub refresher_grace: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(200),
            builder_grace: Duration::from_secs(10),
            refresher_grace: Duration::from_secs(30),
        }
    }
}

impl LifecycleConfig {
    /// Sets the tick length.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Sets both grace periods.
    pub fn with_grace(mut self, builder: Duration, refresher: Duration) -> Self {
        self.builder_grace = builder;
        self.refresher_grace = refresher;
        self
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Counters of worker activity.
#[derive(Debug, Default)]
pub struct LifecycleMetrics {
    ticks: AtomicU64,
    values_pushed: AtomicU64,
    tick_errors: AtomicU64,
    builds_completed: AtomicU64,
    builds_failed: AtomicU64,
    builds_cancelled: AtomicU64,
    overruns: AtomicU64,
}

impl LifecycleMetrics {
    fn record_tick(&self, result: &OpcResult<usize>) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(pushed) => {
                self.values_pushed.fetch_add(*pushed as u64, Ordering::Relaxed);
            }
            Err(_) => {
                self.tick_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> LifecycleMetricsSnapshot {
        LifecycleMetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            values_pushed: self.values_pushed.load(Ordering::Relaxed),
            tick_errors: self.tick_errors.load(Ordering::Relaxed),
            builds_completed: self.builds_completed.load(Ordering::Relaxed),
            builds_failed: self.builds_failed.load(Ordering::Relaxed),
            builds_cancelled: self.builds_cancelled.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LifecycleMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleMetricsSnapshot {
    /// Refresher ticks.
    pub ticks: u64,
    /// Values pushed into the cache.
    pub values_pushed: u64,
    /// Ticks that returned an error.
    pub tick_errors: u64,
    /// Populations that reached `Running`.
    pub builds_completed: u64,
    /// Populations that failed.
    pub builds_failed: u64,
    /// Populations stopped by cancellation.
    pub builds_cancelled: u64,
    /// Workers that overran their grace period.
    pub overruns: u64,
}

// =============================================================================
// Shutdown report
// =============================================================================

/// How a worker ended during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerExit {
    /// The worker was not running.
    NotRunning,
    /// The worker exited within its grace period.
    Joined,
    /// The worker overran its grace period and was detached.
    Overrun,
}

/// Outcome of a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Builder outcome.
    pub builder: WorkerExit,
    /// Refresher outcome.
    pub refresher: WorkerExit,
    /// Time spent waiting.
    pub elapsed: Duration,
}

impl ShutdownReport {
    fn idle() -> Self {
        Self {
            builder: WorkerExit::NotRunning,
            refresher: WorkerExit::NotRunning,
            elapsed: Duration::ZERO,
        }
    }

    /// Returns `true` if no worker overran.
    pub fn is_clean(&self) -> bool {
        self.builder != WorkerExit::Overrun && self.refresher != WorkerExit::Overrun
    }
}

// =============================================================================
// LifecycleController
// =============================================================================

struct Worker {
    name: &'static str,
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

impl Worker {
    fn spawn<F>(name: &'static str, body: F) -> OpcResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, done) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(format!("opcsim-{}", name))
            .spawn(move || {
                // dropped when the thread exits, even by panic
                let _tx = tx;
                body();
            })
            .map_err(|e| {
                OpcError::resource_exhausted(format!("failed to spawn {} worker: {}", name, e))
            })?;
        Ok(Self { name, handle, done })
    }

    fn wait_until(self, deadline: Instant, metrics: &LifecycleMetrics) -> WorkerExit {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.done.recv_timeout(remaining) {
            Err(RecvTimeoutError::Timeout) => {
                metrics.overruns.fetch_add(1, Ordering::Relaxed);
                error!(
                    worker = self.name,
                    "Worker did not stop within its grace period, detaching"
                );
                WorkerExit::Overrun
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    error!(worker = self.name, "Worker panicked");
                }
                debug!(worker = self.name, "Worker joined");
                WorkerExit::Joined
            }
        }
    }
}

struct Workers {
    cancel: CancellationSignal,
    builder: Worker,
    refresher: Worker,
}

/// Starts and stops the builder and refresher workers.
pub struct LifecycleController {
    ctx: Arc<ServerContext>,
    config: LifecycleConfig,
    workers: Mutex<Option<Workers>>,
    metrics: Arc<LifecycleMetrics>,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl LifecycleController {
    /// Creates a controller; no worker runs until [`start`](Self::start).
    pub fn new(ctx: Arc<ServerContext>, config: LifecycleConfig) -> Self {
        Self {
            ctx,
            config,
            workers: Mutex::new(None),
            metrics: Arc::new(LifecycleMetrics::default()),
        }
    }

    /// Returns the worker timing.
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Returns the worker counters.
    pub fn metrics(&self) -> LifecycleMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Returns `true` while the workers are owned by the controller.
    pub fn is_running(&self) -> bool {
        self.workers.lock().is_some()
    }

    /// Starts both workers.
    ///
    /// # Errors
    ///
    /// - `PreconditionFailed` if the workers are already running
    /// - `InvalidArgument` for a zero tick length
    /// - `ResourceExhausted` if a thread cannot be spawned
    pub fn start(&self, workload: Arc<dyn Workload>) -> OpcResult<()> {
        if self.config.tick.is_zero() {
            return Err(OpcError::invalid_argument("tick", "tick length must be positive"));
        }

        let mut slot = self.workers.lock();
        if slot.is_some() {
            return Err(OpcError::precondition_failed("workers are already running"));
        }

        let cancel = CancellationSignal::new();
        let builder = {
            let ctx = Arc::clone(&self.ctx);
            let cancel = cancel.clone();
            let workload = Arc::clone(&workload);
            let metrics = Arc::clone(&self.metrics);
            Worker::spawn("builder", move || run_builder(&ctx, &*workload, &cancel, &metrics))?
        };
        let refresher = {
            let ctx = Arc::clone(&self.ctx);
            let cancel_for_refresher = cancel.clone();
            let metrics = Arc::clone(&self.metrics);
            let tick = self.config.tick;
            let spawned = Worker::spawn("refresher", move || {
                run_refresher(&ctx, &*workload, &cancel_for_refresher, &metrics, tick)
            });
            match spawned {
                Ok(worker) => worker,
                Err(e) => {
                    cancel.cancel();
                    return Err(e);
                }
            }
        };

        info!(tick_ms = self.config.tick.as_millis() as u64, "Workers started");
        *slot = Some(Workers {
            cancel,
            builder,
            refresher,
        });
        Ok(())
    }

    /// Stops both workers within their grace periods.
    pub fn shutdown(&self) -> ShutdownReport {
        let Some(workers) = self.workers.lock().take() else {
            debug!("Shutdown requested with no workers running");
            return ShutdownReport::idle();
        };

        let started = Instant::now();
        info!("Shutting down workers");
        workers.cancel.cancel();

        let builder = workers
            .builder
            .wait_until(started + self.config.builder_grace, &self.metrics);
        let refresher = workers
            .refresher
            .wait_until(started + self.config.refresher_grace, &self.metrics);
        drop(workers.cancel);

        let report = ShutdownReport {
            builder,
            refresher,
            elapsed: started.elapsed(),
        };
        info!(
            builder = ?report.builder,
            refresher = ?report.refresher,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Workers stopped"
        );
        report
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        if let Some(workers) = self.workers.get_mut().take() {
            workers.cancel.cancel();
        }
    }
}

fn run_builder(
    ctx: &ServerContext,
    workload: &dyn Workload,
    cancel: &CancellationSignal,
    metrics: &LifecycleMetrics,
) {
    let result = ctx
        .set_server_state(ServerState::NoConfig)
        .and_then(|()| workload.populate(ctx, cancel));

    match result {
        Ok(()) if cancel.is_cancelled() => {
            metrics.builds_cancelled.fetch_add(1, Ordering::Relaxed);
            info!("Population cancelled");
        }
        Ok(()) => {
            if let Err(e) = ctx.set_server_state(ServerState::Running) {
                error!(error = %e, "Failed to publish running state");
                return;
            }
            metrics.builds_completed.fetch_add(1, Ordering::Relaxed);
            info!(items = ctx.item_count(), "Population completed");
        }
        Err(e) => {
            metrics.builds_failed.fetch_add(1, Ordering::Relaxed);
            error!(error = %e, status = %e.status(), "Population failed");
            if let Err(e) = ctx.set_server_state(ServerState::Failed) {
                error!(error = %e, "Failed to publish failed state");
            }
        }
    }
}

fn run_refresher(
    ctx: &ServerContext,
    workload: &dyn Workload,
    cancel: &CancellationSignal,
    metrics: &LifecycleMetrics,
    tick: Duration,
) {
    loop {
        let running = ctx.server_state() == ServerState::Running;
        let result = workload.tick(ctx, running);
        if let Err(e) = &result {
            warn!(error = %e, "Refresh tick failed");
        }
        metrics.record_tick(&result);

        if cancel.wait_timeout(tick) {
            break;
        }
    }
    debug!("Refresher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ServerParameters;
    use crate::host::InMemoryHost;
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct CountingWorkload {
        fail: bool,
        populated: AtomicBool,
        running_ticks: AtomicU64,
    }

    impl Workload for CountingWorkload {
        fn populate(&self, _ctx: &ServerContext, _cancel: &CancellationSignal) -> OpcResult<()> {
            if self.fail {
                return Err(OpcError::fatal("boom"));
            }
            self.populated.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn tick(&self, _ctx: &ServerContext, running: bool) -> OpcResult<usize> {
            if running {
                self.running_ticks.fetch_add(1, Ordering::SeqCst);
            }
            Ok(1)
        }
    }

    /// Ignores cancellation until released.
    struct StubbornWorkload {
        release: CancellationSignal,
    }

    impl Workload for StubbornWorkload {
        fn populate(&self, _ctx: &ServerContext, _cancel: &CancellationSignal) -> OpcResult<()> {
            self.release.wait_timeout(Duration::from_secs(5));
            Ok(())
        }

        fn tick(&self, _ctx: &ServerContext, _running: bool) -> OpcResult<usize> {
            Ok(0)
        }
    }

    fn setup(config: LifecycleConfig) -> (Arc<InMemoryHost>, LifecycleController) {
        let host = InMemoryHost::shared('.');
        let ctx = Arc::new(ServerContext::new(host.clone(), ServerParameters::default()));
        (host, LifecycleController::new(ctx, config))
    }

    fn fast() -> LifecycleConfig {
        LifecycleConfig::default().with_tick(Duration::from_millis(10))
    }

    fn wait_for(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_builder_reaches_running() {
        let (host, controller) = setup(fast());
        let workload = Arc::new(CountingWorkload::default());
        controller.start(workload.clone()).unwrap();

        wait_for(|| workload.running_ticks.load(Ordering::SeqCst) > 0);
        assert!(workload.populated.load(Ordering::SeqCst));
        assert_eq!(host.server_state(), ServerState::Running);
        assert_eq!(
            host.state_history()[..2],
            [ServerState::NoConfig, ServerState::Running]
        );

        let report = controller.shutdown();
        assert_eq!(report.builder, WorkerExit::Joined);
        assert_eq!(report.refresher, WorkerExit::Joined);
        assert!(controller.metrics().ticks > 0);
    }

    #[test]
    fn test_failed_population_sets_failed() {
        let (host, controller) = setup(fast());
        let workload = Arc::new(CountingWorkload {
            fail: true,
            ..Default::default()
        });
        controller.start(workload.clone()).unwrap();

        wait_for(|| host.server_state() == ServerState::Failed);
        assert_eq!(host.server_state(), ServerState::Failed);
        controller.shutdown();
        assert_eq!(workload.running_ticks.load(Ordering::SeqCst), 0);
        assert_eq!(controller.metrics().builds_failed, 1);
    }

    #[test]
    fn test_second_shutdown_is_noop() {
        let (_host, controller) = setup(fast());
        assert_eq!(controller.shutdown(), ShutdownReport::idle());

        controller
            .start(Arc::new(CountingWorkload::default()))
            .unwrap();
        assert!(controller.start(Arc::new(CountingWorkload::default())).is_err());
        assert!(controller.shutdown().is_clean());
        assert!(!controller.is_running());
        assert_eq!(controller.shutdown(), ShutdownReport::idle());
    }

    #[test]
    fn test_overrun_detaches_worker() {
        let config = fast().with_grace(Duration::from_millis(50), Duration::from_millis(200));
        let (_host, controller) = setup(config);
        let release = CancellationSignal::new();
        controller
            .start(Arc::new(StubbornWorkload {
                release: release.clone(),
            }))
            .unwrap();

        let report = controller.shutdown();
        assert_eq!(report.builder, WorkerExit::Overrun);
        assert_eq!(report.refresher, WorkerExit::Joined);
        assert!(report.elapsed < Duration::from_secs(2));
        assert_eq!(controller.metrics().overruns, 1);
        release.cancel();
    }

    #[test]
    fn test_shutdown_bounded_by_largest_grace() {
        let config = fast().with_grace(Duration::from_millis(100), Duration::from_millis(300));
        let (_host, controller) = setup(config);
        controller
            .start(Arc::new(CountingWorkload::default()))
            .unwrap();
        let start = Instant::now();
        let report = controller.shutdown();
        assert!(report.is_clean());
        assert!(start.elapsed() < Duration::from_millis(300) + Duration::from_millis(200));
    }
}
