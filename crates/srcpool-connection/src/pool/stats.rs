//! Point-in-time pool counters

use serde::Serialize;

/// Snapshot of a pool taken under its idle-set lock
///
/// `idle + checked_out == capacity` always holds; `waiting` counts callers
/// blocked in `acquire` or `acquire_timeout` at the time of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    capacity: usize,
    idle: usize,
    checked_out: usize,
    waiting: usize,
}

impl PoolStats {
    /// # Panics
    ///
    /// Debug builds panic if `idle` exceeds `capacity`.
    pub fn new(capacity: usize, idle: usize, waiting: usize) -> Self {
        debug_assert!(idle <= capacity, "{idle} idle resources in a pool of {capacity}");
        Self {
            capacity,
            idle,
            checked_out: capacity - idle,
            waiting,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn idle(&self) -> usize {
        self.idle
    }

    pub fn checked_out(&self) -> usize {
        self.checked_out
    }

    pub fn waiting(&self) -> usize {
        self.waiting
    }
}
