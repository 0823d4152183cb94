// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! Fluent builders for contexts and sample node managers.

use std::sync::Arc;
use std::time::Duration;

use opcsim_core::{
    BrowseMode, HostCallbacks, InMemoryHost, LifecycleConfig, SampleConfig, SampleNodeManager,
    ServerContext, ServerParameters,
};

// =============================================================================
// ContextBuilder
// =============================================================================

/// Builds a [`ServerContext`] on top of an [`InMemoryHost`].
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    delimiter: char,
    browse_mode: BrowseMode,
    update_period_ms: u32,
}

impl ContextBuilder {
    /// Creates a builder with `.` delimiters and generic browsing.
    pub fn new() -> Self {
        Self {
            delimiter: '.',
            browse_mode: BrowseMode::Generic,
            update_period_ms: 200,
        }
    }

    /// Sets the branch delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Serves browsing from the plugin.
    pub fn custom_browse(mut self) -> Self {
        self.browse_mode = BrowseMode::Custom;
        self
    }

    /// Sets the update period.
    pub fn with_update_period_ms(mut self, period: u32) -> Self {
        self.update_period_ms = period;
        self
    }

    /// Returns the server parameters.
    pub fn parameters(&self) -> ServerParameters {
        ServerParameters::default()
            .with_update_period_ms(self.update_period_ms)
            .with_delimiter(self.delimiter)
            .with_browse_mode(self.browse_mode)
    }

    /// Builds the host and the context.
    pub fn build(self) -> (Arc<InMemoryHost>, Arc<ServerContext>) {
        let host = InMemoryHost::shared(self.delimiter);
        let ctx = self.build_on(host.clone());
        (host, ctx)
    }

    /// Builds a context on top of an existing host.
    pub fn build_on(self, host: Arc<dyn HostCallbacks>) -> Arc<ServerContext> {
        Arc::new(ServerContext::new(host, self.parameters()))
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SampleServerBuilder
// =============================================================================

/// Builds a [`SampleNodeManager`] with fast timings.
#[derive(Debug, Clone)]
pub struct SampleServerBuilder {
    context: ContextBuilder,
    lifecycle: LifecycleConfig,
    sample: SampleConfig,
}

impl SampleServerBuilder {
    /// Creates a builder: one mass block, 10 ms ticks, seeded simulation.
    pub fn new() -> Self {
        Self {
            context: ContextBuilder::new(),
            lifecycle: LifecycleConfig::default()
                .with_tick(Duration::from_millis(10))
                .with_grace(Duration::from_secs(5), Duration::from_secs(5)),
            sample: SampleConfig {
                mass_item_groups: 1,
                mass_item_delay: Duration::from_millis(1),
                event_space: true,
                seed: Some(7),
                ..SampleConfig::default()
            },
        }
    }

    /// Sets the number of mass item blocks.
    pub fn with_mass_item_groups(mut self, groups: usize) -> Self {
        self.sample.mass_item_groups = groups;
        self
    }

    /// Sets the pause after each mass item block.
    pub fn with_mass_item_delay(mut self, delay: Duration) -> Self {
        self.sample.mass_item_delay = delay;
        self
    }

    /// Enables or disables the sample event space.
    pub fn with_event_space(mut self, enabled: bool) -> Self {
        self.sample.event_space = enabled;
        self
    }

    /// Sets the simulation seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sample.seed = Some(seed);
        self
    }

    /// Sets the refresher tick.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.lifecycle = self.lifecycle.with_tick(tick);
        self
    }

    /// Sets both grace periods.
    pub fn with_grace(mut self, builder: Duration, refresher: Duration) -> Self {
        self.lifecycle = self.lifecycle.with_grace(builder, refresher);
        self
    }

    /// Serves browsing from the plugin.
    pub fn custom_browse(mut self) -> Self {
        self.context = self.context.custom_browse();
        self
    }

    /// Returns the lifecycle timings.
    pub fn lifecycle(&self) -> LifecycleConfig {
        self.lifecycle
    }

    /// Returns the sample options.
    pub fn sample(&self) -> &SampleConfig {
        &self.sample
    }

    /// Builds the node manager on a fresh in-memory host.
    pub fn build(self) -> (Arc<InMemoryHost>, SampleNodeManager) {
        let host = InMemoryHost::shared('.');
        let manager = self.build_on(host.clone());
        (host, manager)
    }

    /// Builds the node manager on top of an existing host.
    pub fn build_on(self, host: Arc<dyn HostCallbacks>) -> SampleNodeManager {
        let ctx = self.context.build_on(host);
        SampleNodeManager::new(ctx, self.lifecycle, self.sample)
            .expect("sample node manager should build")
    }
}

impl Default for SampleServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
