//! Query cache statistics
//!
//! Counters are kept in atomics so reads, joins and completions can record
//! them without touching the registry lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of query cache activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Current number of entries
    pub entries: usize,

    /// Reads answered from cached data (fresh or stale)
    pub hits: u64,

    /// Reads that found no data and had to wait for a fetch
    pub misses: u64,

    /// Fetcher invocations issued
    pub fetches: u64,

    /// Requests attached to an already running fetch
    pub joined: u64,

    /// Completions dropped because a newer fetch superseded them
    pub discarded: u64,

    /// Fetches that ended in an error
    pub failures: u64,
}

impl QueryStats {
    /// Calculate hit rate (hits / total reads)
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_reads();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of reads (hits + misses)
    pub fn total_reads(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of fetches that failed
    pub fn failure_rate(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.failures as f64 / self.fetches as f64
        }
    }
}

/// Thread-safe metrics collector for query cache operations
#[derive(Debug, Clone, Default)]
pub(crate) struct MetricsCollector {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    fetches: Arc<AtomicU64>,
    joined: Arc<AtomicU64>,
    discarded: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
}

impl MetricsCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join(&self) {
        self.joined.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> QueryStats {
        QueryStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
