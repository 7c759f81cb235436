use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free feed counters.
///
/// `snapshot()` atomically reads and resets all counters, making it
/// suitable for periodic reporting without contention.
pub struct FeedStats {
    received: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// One reporting window of feed counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedStatsSnapshot {
    pub received: u64,
    pub accepted: u64,
    pub rejected: u64,
}

impl FeedStatsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.received == 0 && self.accepted == 0 && self.rejected == 0
    }
}

impl FeedStats {
    /// Create a new zeroed FeedStats.
    pub fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Count one raw payload off the wire.
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one payload that decoded cleanly.
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one payload discarded by the decoder.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Atomically read and reset all counters.
    pub fn snapshot(&self) -> FeedStatsSnapshot {
        FeedStatsSnapshot {
            received: self.received.swap(0, Ordering::Relaxed),
            accepted: self.accepted.swap(0, Ordering::Relaxed),
            rejected: self.rejected.swap(0, Ordering::Relaxed),
        }
    }
}

impl Default for FeedStats {
    fn default() -> Self {
        Self::new()
    }
}
