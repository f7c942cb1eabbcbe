//! Request/response correlation table (part of C6, spec.md §3
//! "Correlation table").
//!
//! Each `sendAndWait` call inserts a single-use completion slot keyed by
//! `eventId`. The slot is removed either by the worker publishing a result
//! or by the deadline firing — whichever happens first; `DashMap::remove`
//! returning at most one `Some` makes that race resolve atomically so a
//! late publish after a timeout is silently discarded, per spec.md §4.6.

use dashmap::DashMap;
use tokio::sync::oneshot;

use crate::envelope::EventResult;
use crate::ids::EventId;

/// Concurrently inserted by callers (`sendAndWait`) and resolved by
/// workers (after `dispatch` returns).
#[derive(Default)]
pub struct CorrelationTable {
    slots: DashMap<EventId, oneshot::Sender<EventResult>>,
}

impl CorrelationTable {
    /// Construct an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new slot for `event_id`, returning the receiver half the
    /// caller awaits.
    pub fn allocate(&self, event_id: EventId) -> oneshot::Receiver<EventResult> {
        let (tx, rx) = oneshot::channel();
        self.slots.insert(event_id, tx);
        rx
    }

    /// Resolve the slot for `event_id` with `result`, if it is still
    /// outstanding. Returns `false` if the slot had already been removed
    /// (deadline already fired, or no such slot was ever allocated) — the
    /// worker discards a late publish rather than treating this as an
    /// error.
    pub fn publish(&self, event_id: EventId, result: EventResult) -> bool {
        match self.slots.remove(&event_id) {
            Some((_, tx)) => tx.send(result).is_ok(),
            None => false,
        }
    }

    /// Remove the slot for `event_id` without resolving it — used by the
    /// caller when its own deadline fires first, so a subsequent worker
    /// publish finds nothing to resolve.
    pub fn cancel(&self, event_id: EventId) {
        self.slots.remove(&event_id);
    }

    /// Number of currently outstanding correlation slots.
    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }

    /// Resolve every outstanding slot with a `shutdown` failure and clear
    /// the table. Called once by `dispose()`.
    pub fn cancel_all_with_shutdown(&self) {
        let keys: Vec<EventId> = self.slots.iter().map(|entry| *entry.key()).collect();
        for key in keys {
            if let Some((event_id, tx)) = self.slots.remove(&key) {
                let _ = tx.send(EventResult::failure(event_id, crate::error::ErrorKind::Shutdown, None));
            }
        }
    }
}
