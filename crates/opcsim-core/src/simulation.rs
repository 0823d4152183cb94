// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Synthetic data generator.
//!
//! The engine is advanced once per refresher tick. Values are recomputed
//! once per second of wall time, every `1000 / tick_ms` ticks:
//!
//! - ramp counts up by one and wraps to 0 after 100
//! - sine walks a 40-step cycle with a step of 2π/40
//! - random draws an integer in `0..=RANDOM_MAX`
//!
//! Between recomputes [`SimulationEngine::tick`] returns the previous values
//! so the caller can still refresh item timestamps.

use std::f64::consts::PI;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::{OpcError, OpcResult};

/// Default tick length.
pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

/// Highest ramp value before wrapping.
pub const RAMP_MAX: i32 = 100;

/// Number of recomputes in one sine cycle.
pub const SINE_STEPS: u64 = 40;

/// Highest random value.
pub const RANDOM_MAX: i32 = 32767;

const SINE_STEP: f64 = 2.0 * PI / SINE_STEPS as f64;

/// Values produced by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationSample {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Whether the values were recomputed on this tick.
    pub recomputed: bool,
    /// Ramp value.
    pub ramp: i32,
    /// Sine value in `[-1, 1]`.
    pub sine: f64,
    /// Random value.
    pub random: i32,
    /// Time of the tick.
    pub timestamp: DateTime<Utc>,
}

/// Stateful ramp/sine/random generator.
#[derive(Debug)]
pub struct SimulationEngine {
    tick_length: Duration,
    recompute_every: u64,
    ticks: u64,
    interval: u64,
    recomputes: u64,
    ramp: i32,
    sine: f64,
    random: i32,
    rng: StdRng,
}

impl SimulationEngine {
    /// Creates an engine seeded from the operating system.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `tick_length` is zero.
    pub fn new(tick_length: Duration) -> OpcResult<Self> {
        Self::with_rng(tick_length, StdRng::from_entropy())
    }

    /// Creates an engine with a fixed random seed.
    pub fn with_seed(tick_length: Duration, seed: u64) -> OpcResult<Self> {
        Self::with_rng(tick_length, StdRng::seed_from_u64(seed))
    }

    fn with_rng(tick_length: Duration, rng: StdRng) -> OpcResult<Self> {
        let tick_ms = tick_length.as_millis() as u64;
        if tick_ms == 0 {
            return Err(OpcError::invalid_argument(
                "tick_length",
                "tick length must be at least 1 ms",
            ));
        }

        Ok(Self {
            tick_length,
            recompute_every: (1000 / tick_ms).max(1),
            ticks: 0,
            interval: 0,
            recomputes: 0,
            ramp: 0,
            sine: 0.0,
            random: 0,
            rng,
        })
    }

    /// Returns the tick length.
    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    /// Returns the number of ticks between recomputes.
    pub fn recompute_every(&self) -> u64 {
        self.recompute_every
    }

    /// Returns the number of ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Returns the number of recomputes so far.
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    /// Advances the engine by one tick.
    pub fn tick(&mut self) -> SimulationSample {
        self.ticks += 1;
        self.interval += 1;

        let recomputed = self.interval >= self.recompute_every;
        if recomputed {
            self.interval = 0;
            self.recompute();
        }

        SimulationSample {
            tick: self.ticks,
            recomputed,
            ramp: self.ramp,
            sine: self.sine,
            random: self.random,
            timestamp: Utc::now(),
        }
    }

    fn recompute(&mut self) {
        self.recomputes += 1;
        self.ramp = if self.ramp >= RAMP_MAX { 0 } else { self.ramp + 1 };
        self.sine = ((self.recomputes % SINE_STEPS) as f64 * SINE_STEP).sin();
        self.random = self.rng.gen_range(0..=RANDOM_MAX);
    }
}
