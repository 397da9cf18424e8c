//! Access Metrics Module
//!
//! Counters describing how a map is being used: how many reads and writes it
//! served, how often lookups hit, and how often a caller had to wait for the
//! lock. Counting uses atomics and never takes the map lock.

#[cfg(feature = "metrics")]
use core::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the access counters of a map
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessMetrics {
    /// Lookups (`get`, `get_with`, `contains_key` and their `try_` forms)
    pub reads: u64,
    /// Insertions and overwrites
    pub writes: u64,
    /// Removal attempts, including removals of absent keys
    pub removals: u64,
    /// Lookups that found their key
    pub hits: u64,
    /// Lookups that did not find their key
    pub misses: u64,
    /// Full traversals (`for_each`, `snapshot`)
    pub traversals: u64,
    /// Every acquisition of the map lock, shared or exclusive
    pub lock_acquisitions: u64,
    /// Lock acquisitions that could not proceed immediately and had to wait
    pub contended_operations: u64,
}

impl AccessMetrics {
    /// Total number of recorded operations
    pub fn total_operations(&self) -> u64 {
        self.reads + self.writes + self.removals + self.traversals
    }

    /// Fraction of lookups that found their key, as a percentage
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            (self.hits as f64 / lookups as f64) * 100.0
        }
    }

    /// Fraction of lock acquisitions that had to wait, as a percentage
    ///
    /// Counted per acquisition, so calls outside `total_operations` (such as
    /// `len` or `clear`) and batched writes each weigh once.
    pub fn contention_rate(&self) -> f64 {
        if self.lock_acquisitions == 0 {
            0.0
        } else {
            let contended = self.contended_operations.min(self.lock_acquisitions);
            (contended as f64 / self.lock_acquisitions as f64) * 100.0
        }
    }
}

#[cfg(feature = "metrics")]
#[derive(Debug, Default)]
pub(crate) struct AtomicMetrics {
    reads: AtomicU64,
    writes: AtomicU64,
    removals: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    traversals: AtomicU64,
    lock_acquisitions: AtomicU64,
    contended_operations: AtomicU64,
}

#[cfg(feature = "metrics")]
impl AtomicMetrics {
    pub(crate) fn record_read(&self, hit: bool) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_writes(&self, count: u64) {
        self.writes.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_traversal(&self) {
        self.traversals.fetch_add(1, Ordering::Relaxed);
    }

    // Acquisitions are bumped before contentions and read after them, so a
    // snapshot never holds more contentions than acquisitions.
    pub(crate) fn record_acquisition(&self, contended: bool) {
        self.lock_acquisitions.fetch_add(1, Ordering::Release);
        if contended {
            self.contended_operations.fetch_add(1, Ordering::Release);
        }
    }

    pub(crate) fn snapshot(&self) -> AccessMetrics {
        let contended_operations = self.contended_operations.load(Ordering::Acquire);
        AccessMetrics {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            traversals: self.traversals.load(Ordering::Relaxed),
            contended_operations,
            lock_acquisitions: self.lock_acquisitions.load(Ordering::Acquire),
        }
    }

    pub(crate) fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.removals.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.traversals.store(0, Ordering::Relaxed);
        self.contended_operations.store(0, Ordering::Relaxed);
        self.lock_acquisitions.store(0, Ordering::Relaxed);
    }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub(crate) struct AtomicMetrics;

#[cfg(not(feature = "metrics"))]
impl AtomicMetrics {
    pub(crate) fn record_read(&self, _hit: bool) {}
    pub(crate) fn record_writes(&self, _count: u64) {}
    pub(crate) fn record_removal(&self) {}
    pub(crate) fn record_traversal(&self) {}
    pub(crate) fn record_acquisition(&self, _contended: bool) {}
    pub(crate) fn snapshot(&self) -> AccessMetrics {
        AccessMetrics::default()
    }
    pub(crate) fn reset(&self) {}
}

/// Trait for containers that expose access metrics
pub trait MetricsCollector {
    /// Get the current counters
    fn metrics(&self) -> AccessMetrics;

    /// Reset all counters to zero
    fn reset_metrics(&self);

    /// Enable or disable counting
    fn set_metrics_enabled(&self, enabled: bool);

    /// Check whether counting is enabled
    fn is_metrics_enabled(&self) -> bool;
}
