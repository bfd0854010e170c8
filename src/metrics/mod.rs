//! Counters for retry and classification metrics.
//!
//! This module only defines the counter interface and two implementations.
//! Publishing the values anywhere is left to the embedding application.

use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};

/// A monotonic-or-not integer counter.
pub trait Counter: Send + Sync + Debug {
    /// Adds one.
    fn increment(&self) {
        self.increment_by(1);
    }

    /// Adds `value`.
    fn increment_by(&self, value: i64);

    /// Subtracts one.
    fn decrement(&self) {
        self.decrement_by(1);
    }

    /// Subtracts `value`.
    fn decrement_by(&self, value: i64);

    /// Returns the current value.
    fn count(&self) -> i64;
}

/// A counter that discards every update and always reads zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpCounter;

impl NoOpCounter {
    /// Creates a no-op counter.
    pub fn create() -> Self {
        NoOpCounter
    }
}

impl Counter for NoOpCounter {
    fn increment_by(&self, _value: i64) {}

    fn decrement_by(&self, _value: i64) {}

    fn count(&self) -> i64 {
        0
    }
}

/// A lock-free in-memory counter.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicI64,
}

impl AtomicCounter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Counter for AtomicCounter {
    fn increment_by(&self, value: i64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    fn decrement_by(&self, value: i64) {
        self.value.fetch_sub(value, Ordering::Relaxed);
    }

    fn count(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}
