// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcsim-core
//!
//! Server customization plugin for an OPC DA/AE style data server.
//!
//! A generic host process owns the protocol surface and the value cache.
//! This crate supplies the device-specific part:
//!
//! - **Quality**: 16-bit quality word codec
//! - **Catalog**: Item definitions, per-item state and custom properties
//! - **Event Space**: Categories, conditions, areas and sources of alarms and events
//! - **Simulation**: Ramp, sine and random generators driven by a fixed tick
//! - **Browse**: Hierarchical namespace navigation for custom browse mode
//! - **Lifecycle**: Builder and refresher workers with bounded shutdown
//! - **Gateway**: Host callbacks and node manager traits
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opcsim_core::{
//!     InMemoryHost, LifecycleConfig, NodeManager, SampleConfig, SampleNodeManager,
//!     ServerContext, ServerParameters,
//! };
//!
//! let host = InMemoryHost::shared('.');
//! let ctx = Arc::new(ServerContext::new(host.clone(), ServerParameters::default()));
//! let manager = SampleNodeManager::new(ctx, LifecycleConfig::default(), SampleConfig::default())?;
//!
//! manager.on_create_server_items()?;
//! // ... serve clients ...
//! manager.on_shutdown_signal()?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod quality;
pub mod types;

// =============================================================================
// Address Space Modules
// =============================================================================

pub mod browse;
pub mod catalog;
pub mod event_space;

// =============================================================================
// Runtime Modules
// =============================================================================

pub mod cancel;
pub mod context;
pub mod lifecycle;
pub mod simulation;

// =============================================================================
// Host Integration Modules
// =============================================================================

pub mod gateway;
pub mod host;
pub mod sample;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::{OpcError, OpcResult, Status};
pub use quality::{LimitBits, Quality, QualityBits};
pub use types::*;

pub use browse::{BrowseFilter, BrowseIter, BrowseNavigator, BrowseSessions, LeafInfo, Namespace};
pub use catalog::{
    CatalogMetrics, CatalogMetricsSnapshot, DeviceItem, ItemCatalog, ItemDefinition, ItemSnapshot,
    PropertyDefinition, PropertySet,
};
pub use event_space::{
    ConditionDefinition, ConditionDefinitionKind, ConditionStateChange, EventFilter, EventKind,
    EventNotification, EventSpace, EventSpaceStats, EventSubscription, SimpleEvent,
    SingleStateDefinition, SubConditionDefinition, TrackingEvent,
};

pub use cancel::CancellationSignal;
pub use context::ServerContext;
pub use lifecycle::{
    LifecycleConfig, LifecycleController, LifecycleMetrics, LifecycleMetricsSnapshot,
    ShutdownReport, WorkerExit, Workload,
};
pub use simulation::{SimulationEngine, SimulationSample};

pub use gateway::{
    AttributeItemMapping, ClientDecision, ClientInfo, GroupInfo, GroupState, HostCallbacks,
    ItemRequest, ItemStateInfo, ItemWrite, NodeManager, OptimizationParameters, RequestOutcome,
    ServerDefinition, ServerKind, ServerParameters,
};
pub use host::{InMemoryHost, ShutdownHandler};
pub use sample::{SampleConfig, SampleNodeManager, SampleWorkload};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
