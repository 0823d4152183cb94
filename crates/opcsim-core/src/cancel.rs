// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Cooperative cancellation signal shared by the background workers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A level-triggered, manual-reset cancellation signal.
///
/// Once raised, every current and future waiter observes it until
/// [`reset`](Self::reset) is called. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl CancellationSignal {
    /// Creates a signal in the not-raised state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal and wakes every waiter.
    pub fn cancel(&self) {
        let mut raised = self.inner.raised.lock();
        *raised = true;
        self.inner.condvar.notify_all();
    }

    /// Lowers the signal.
    pub fn reset(&self) {
        *self.inner.raised.lock() = false;
    }

    /// Returns `true` if the signal is raised.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.raised.lock()
    }

    /// Waits until the signal is raised or `timeout` elapses.
    ///
    /// Returns `true` if the signal is raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut raised = self.inner.raised.lock();
        while !*raised {
            if self
                .inner
                .condvar
                .wait_until(&mut raised, deadline)
                .timed_out()
            {
                break;
            }
        }
        *raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wait_times_out_when_not_raised() {
        let signal = CancellationSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_cancel_wakes_waiters() {
        let signal = CancellationSignal::new();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || signal.wait_timeout(Duration::from_secs(10)))
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        signal.cancel();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_signal_is_level_triggered() {
        let signal = CancellationSignal::new();
        signal.cancel();
        assert!(signal.wait_timeout(Duration::ZERO));
        assert!(signal.wait_timeout(Duration::from_secs(1)));
        signal.reset();
        assert!(!signal.is_cancelled());
    }
}
