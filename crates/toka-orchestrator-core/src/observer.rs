//! Observability hooks (C8, spec.md §4.8).
//!
//! A minimal sink interface invoked on the worker thread. Implementations
//! must be non-blocking. The hot path skips the call entirely when both
//! `enable_metrics` and `enable_logging` are false — checked by the
//! caller in `worker.rs`, not inside the hook, so a disabled hook costs
//! nothing beyond a branch.

use crate::envelope::{Envelope, EventResult};

/// Observer trait for per-event and per-bus-stat callbacks.
///
/// Metrics dashboards, structured-log sinks, and trace exporters are out
/// of scope for this crate (spec.md §1); this trait is the seam an
/// embedding application hangs such sinks off of.
pub trait ObserverHook: Send + Sync {
    /// Called once per processed envelope, after the result is built.
    fn on_event(&self, envelope: &Envelope, result: &EventResult);

    /// Called after each envelope's processing with the bus's running
    /// counters.
    fn on_bus_stat(&self, bus_index: usize, total_processed: u64, queued_depth: usize);
}

/// Default hook: does nothing. Used when no observer is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl ObserverHook for NoopHook {
    fn on_event(&self, _envelope: &Envelope, _result: &EventResult) {}
    fn on_bus_stat(&self, _bus_index: usize, _total_processed: u64, _queued_depth: usize) {}
}

/// Hook that emits `tracing` events, the ambient logging facility this
/// workspace standardizes on (`toka-kernel`, `toka-orchestration`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHook;

impl ObserverHook for TracingHook {
    fn on_event(&self, envelope: &Envelope, result: &EventResult) {
        if result.success {
            tracing::debug!(
                event_id = %envelope.event_id(),
                target = %envelope.target_id(),
                name = envelope.name(),
                new_state = %result.new_state,
                "event processed"
            );
        } else {
            tracing::warn!(
                event_id = %envelope.event_id(),
                target = %envelope.target_id(),
                name = envelope.name(),
                error_kind = ?result.error_kind,
                error = %result.error_message,
                "event failed"
            );
        }
    }

    fn on_bus_stat(&self, bus_index: usize, total_processed: u64, queued_depth: usize) {
        tracing::trace!(bus_index, total_processed, queued_depth, "bus stat");
    }
}
