// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcsim Integration Tests
//!
//! Integration tests for the opcsim server plugin together with the test
//! utilities they share.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities, fixtures, and helpers
//!   - `fixtures`: Pre-built items, event spaces and configuration files
//!   - `builders`: Builders for contexts and sample node managers
//!   - `assertions`: Custom assertion helpers
//!   - `mocks`: A recording host with failure injection
//!   - `harness`: A running sample server that stops on drop
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p opcsim-tests
//!
//! # Run specific test suite
//! cargo test -p opcsim-tests --test integration_catalog
//! cargo test -p opcsim-tests --test integration_event_space
//! cargo test -p opcsim-tests --test integration_lifecycle
//! cargo test -p opcsim-tests --test integration_browse
//! cargo test -p opcsim-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Catalog Tests (`integration_catalog.rs`)
//! - Quality word encoding
//! - Item creation, naming rules and conflicts
//! - Value updates, type checks and record atomicity
//! - Soft removal with outstanding group references
//! - Standard and vendor specific properties
//!
//! ### Event Space Tests (`integration_event_space.rs`)
//! - Categories, attributes, areas and sources
//! - Simple and tracking events
//! - Condition state machines and acknowledgement
//! - Subscription filters and bounded queues
//!
//! ### Lifecycle Tests (`integration_lifecycle.rs`)
//! - Server state sequence during population
//! - Refresh of simulated items
//! - Population failure and cancellation
//! - Bounded shutdown
//!
//! ### Browse Tests (`integration_browse.rs`)
//! - Custom browse through the node manager
//! - Generic browse served by the host
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML, TOML and JSON files
//! - Environment overrides and placeholders
//! - Validation rules
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use opcsim_tests::prelude::*;
//!
//! #[test]
//! fn test_something() {
//!     let harness =
//!         ServerHarness::start(SampleServerBuilder::new().with_mass_item_groups(0)).unwrap();
//!     assert!(harness.wait_running());
//!     // ... test logic
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
}
