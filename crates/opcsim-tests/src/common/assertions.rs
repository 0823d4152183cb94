// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Domain-specific assertion helpers for opcsim integration tests.
//!
//! ## Design Principles
//!
//! - Provide clear, informative failure messages
//! - Compare plugin errors by status code, not by message text

use std::time::{Duration, Instant};

use opcsim_core::{ItemSnapshot, OpcResult, Quality, QualityBits, Status, Value};

// =============================================================================
// Snapshot Assertions
// =============================================================================

/// Assertion extensions for [`ItemSnapshot`].
pub trait SnapshotAssertions {
    /// Assert that the cached quality is good.
    fn assert_good(&self);

    /// Assert the cached quality.
    fn assert_quality(&self, expected: Quality);

    /// Assert the quality status bits, ignoring limit and vendor bits.
    fn assert_quality_bits(&self, expected: QualityBits);

    /// Assert the cached value.
    fn assert_value(&self, expected: &Value);

    /// Assert that the value is within a tolerance.
    fn assert_value_approx(&self, expected: f64, tolerance: f64);
}

impl SnapshotAssertions for ItemSnapshot {
    fn assert_good(&self) {
        assert!(
            self.quality.is_good(),
            "Expected good quality for {}, but got {:?}",
            self.name,
            self.quality
        );
    }

    fn assert_quality(&self, expected: Quality) {
        assert_eq!(
            self.quality, expected,
            "Expected quality {:?} for {}, but got {:?}",
            expected, self.name, self.quality
        );
    }

    fn assert_quality_bits(&self, expected: QualityBits) {
        assert_eq!(
            self.quality.quality, expected,
            "Expected quality bits {:?} for {}, but got {:?}",
            expected, self.name, self.quality.quality
        );
    }

    fn assert_value(&self, expected: &Value) {
        assert_eq!(
            &self.value, expected,
            "Expected value {:?} for {}, but got {:?}",
            expected, self.name, self.value
        );
    }

    fn assert_value_approx(&self, expected: f64, tolerance: f64) {
        let actual = self
            .value
            .as_f64()
            .unwrap_or_else(|| panic!("Value of {} is not numeric: {:?}", self.name, self.value));
        assert!(
            (actual - expected).abs() <= tolerance,
            "Expected {} = {} ± {}, but got {}",
            self.name,
            expected,
            tolerance,
            actual
        );
    }
}

// =============================================================================
// Status Assertions
// =============================================================================

/// Asserts that `result` failed with `expected`.
#[track_caller]
pub fn assert_status<T: std::fmt::Debug>(result: &OpcResult<T>, expected: Status) {
    match result {
        Ok(value) => panic!("Expected {:?}, but got Ok({:?})", expected, value),
        Err(e) => assert_eq!(
            e.status(),
            expected,
            "Expected {:?}, but got {:?}: {}",
            expected,
            e.status(),
            e
        ),
    }
}

/// Assertion helper for plugin results.
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value.
    fn assert_ok(self) -> T;

    /// Assert that the result failed with `expected`.
    fn assert_status(self, expected: Status);
}

impl<T: std::fmt::Debug> ResultAssertions<T> for OpcResult<T> {
    #[track_caller]
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, but got {:?}: {}", e.status(), e),
        }
    }

    #[track_caller]
    fn assert_status(self, expected: Status) {
        assert_status(&self, expected);
    }
}

// =============================================================================
// Polling Helpers
// =============================================================================

/// Polls `condition` until it holds or `timeout` passes.
pub fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Assert that a condition eventually becomes true.
#[macro_export]
macro_rules! assert_eventually {
    ($condition:expr, $timeout:expr) => {
        assert!(
            $crate::common::assertions::wait_for(|| $condition, $timeout),
            "Condition did not become true within {:?}: {}",
            $timeout,
            stringify!($condition)
        )
    };
}
