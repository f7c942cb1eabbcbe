//! Machine records and their lifecycle (part of C4, spec.md §3 "Machine
//! record" and §3 "Lifecycles").

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::envelope::Envelope;
use crate::ids::MachineId;
use crate::interpreter::MachineInterpreter;

/// A machine's position in its registered → started → stopped → disposed
/// lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Registered but not yet started; events enqueue but do not drain.
    Registered,
    /// Started; events drain and are dispatched normally.
    Started,
    /// Stopped; further dispatch attempts fail with `MachineStopped`.
    Stopped,
    /// Disposed; terminal, identical routing behavior to `Stopped`.
    Disposed,
}

impl LifecycleState {
    fn to_tag(self) -> u8 {
        match self {
            LifecycleState::Registered => 0,
            LifecycleState::Started => 1,
            LifecycleState::Stopped => 2,
            LifecycleState::Disposed => 3,
        }
    }

    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => LifecycleState::Registered,
            1 => LifecycleState::Started,
            2 => LifecycleState::Stopped,
            _ => LifecycleState::Disposed,
        }
    }
}

/// A registered machine: its interpreter, its permanent bus assignment, and
/// its lifecycle state.
///
/// Exactly one bus owns a machine for its lifetime — `bus_index` is set at
/// construction and never changes (spec.md §3 invariant). Lifecycle state
/// is a lock-free atomic because it is read on every event's hot path and
/// written only by `startMachine`/`stopMachine`/`dispose`.
pub struct MachineRecord {
    id: MachineId,
    interpreter: Arc<dyn MachineInterpreter>,
    bus_index: usize,
    lifecycle: AtomicU8,
    /// Envelopes dequeued while this machine was still `Registered`,
    /// held in arrival order and flushed back onto the bus by
    /// `take_pending_and_start` once `start()` runs (spec.md §4.6: events
    /// enqueued before start are processed after start, in the order they
    /// arrived). The mutex also serializes `stage_if_not_started` against
    /// `take_pending_and_start` so the two can never race past each other.
    pending_before_start: Mutex<Vec<Envelope>>,
}

impl MachineRecord {
    /// Construct a freshly registered record, permanently bound to
    /// `bus_index`.
    pub fn new(id: MachineId, interpreter: Arc<dyn MachineInterpreter>, bus_index: usize) -> Self {
        Self {
            id,
            interpreter,
            bus_index,
            lifecycle: AtomicU8::new(LifecycleState::Registered.to_tag()),
            pending_before_start: Mutex::new(Vec::new()),
        }
    }

    /// The machine's id.
    pub fn id(&self) -> &MachineId {
        &self.id
    }

    /// The bus this machine is permanently bound to.
    pub fn bus_index(&self) -> usize {
        self.bus_index
    }

    /// The bound interpreter.
    pub fn interpreter(&self) -> &Arc<dyn MachineInterpreter> {
        &self.interpreter
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> LifecycleState {
        LifecycleState::from_tag(self.lifecycle.load(Ordering::Acquire))
    }

    /// Transition to `Started`. Idempotent if already started.
    pub fn mark_started(&self) {
        self.lifecycle.store(LifecycleState::Started.to_tag(), Ordering::Release);
    }

    /// Stage `envelope` because this machine is still `Registered`,
    /// preserving arrival order instead of requeuing it onto the shared
    /// bus (which would let a later-arriving sibling envelope race ahead
    /// of it). Returns the envelope back to the caller if `start()` raced
    /// ahead and already drained the buffer via `take_pending_and_start`
    /// by the time this call acquired the lock — the caller should then
    /// dispatch it immediately instead of staging it into a buffer no one
    /// will ever flush again.
    pub fn stage_if_not_started(&self, envelope: Envelope) -> Option<Envelope> {
        let mut pending = self.pending_before_start.lock().expect("pending buffer poisoned");
        if self.lifecycle() != LifecycleState::Registered {
            return Some(envelope);
        }
        pending.push(envelope);
        None
    }

    /// Atomically mark this record `Started` and return every envelope
    /// staged by `stage_if_not_started` before this call, in the order
    /// they were staged. Holding the same lock across the mark and the
    /// drain is what makes the race in `stage_if_not_started` resolve one
    /// way or the other instead of silently losing an envelope.
    pub fn take_pending_and_start(&self) -> Vec<Envelope> {
        let mut pending = self.pending_before_start.lock().expect("pending buffer poisoned");
        self.mark_started();
        std::mem::take(&mut *pending)
    }

    /// Transition to `Stopped`. Idempotent.
    pub fn mark_stopped(&self) {
        self.lifecycle.store(LifecycleState::Stopped.to_tag(), Ordering::Release);
    }

    /// Transition to `Disposed`. Terminal.
    pub fn mark_disposed(&self) {
        self.lifecycle.store(LifecycleState::Disposed.to_tag(), Ordering::Release);
    }

    /// Whether this machine is currently eligible to have events
    /// dispatched to it (started, and not stopped/disposed).
    pub fn is_dispatchable(&self) -> bool {
        matches!(self.lifecycle(), LifecycleState::Started)
    }
}

impl std::fmt::Debug for MachineRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineRecord")
            .field("id", &self.id)
            .field("bus_index", &self.bus_index)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}
