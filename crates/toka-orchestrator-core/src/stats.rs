//! Snapshot types returned by `Orchestrator::stats` (spec.md §4.6
//! `getStats`).

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-bus counters, updated only by that bus's own worker task.
#[derive(Debug, Default)]
pub struct BusCounters {
    total_processed: AtomicU64,
    deferred_dropped: AtomicU64,
}

impl BusCounters {
    /// Record one processed envelope.
    pub fn record_processed(&self) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one deferred send dropped under backpressure (spec.md
    /// §4.7, the `internalDeferred` full policy).
    pub fn record_deferred_dropped(&self) {
        self.deferred_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Total envelopes processed so far.
    pub fn total_processed(&self) -> u64 {
        self.total_processed.load(Ordering::Relaxed)
    }

    /// Total deferred sends dropped so far.
    pub fn deferred_dropped(&self) -> u64 {
        self.deferred_dropped.load(Ordering::Relaxed)
    }
}

/// A point-in-time snapshot of one bus's counters.
#[derive(Debug, Clone, Copy)]
pub struct BusStats {
    /// The bus's index within the pool.
    pub index: usize,
    /// Total envelopes processed since construction.
    pub total_processed: u64,
    /// Approximate current queue occupancy.
    pub queued_depth: usize,
    /// Deferred sends dropped under backpressure on this bus.
    pub deferred_dropped: u64,
}

/// Snapshot of the whole orchestrator, returned by `stats()`.
#[derive(Debug, Clone)]
pub struct OrchestratorStats {
    /// Number of machines currently registered.
    pub registered_count: usize,
    /// Per-bus counters.
    pub buses: Vec<BusStats>,
    /// Number of `sendAndWait` calls currently awaiting a result.
    pub pending_correlations: usize,
}
