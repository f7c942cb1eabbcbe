//! Event envelope and result types (C1, spec.md §4.1).
//!
//! Immutable records. Identifiers are opaque and compared bytewise.
//! Payloads pass through without interpretation and may be absent. An
//! envelope carries no mutable state and no reference back to the
//! orchestrator; correlation is maintained separately by the facade (C6).

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::ErrorKind;
use crate::ids::{EventId, MachineId};

/// How an envelope's outcome is communicated back to its originator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryMode {
    /// The caller is suspended on a correlation slot awaiting the result.
    AwaitResult,
    /// The caller receives only an accept/reject indication at submission.
    FireAndForget,
    /// A cross-machine send requested from inside an action, enqueued by
    /// the worker after `dispatch` returns. Carries no response slot.
    InternalDeferred,
}

/// An immutable record carrying a single event submission through the
/// orchestrator.
///
/// Constructed once at submission time and never mutated afterward —
/// there are deliberately no `&mut self` accessors.
#[derive(Debug, Clone)]
pub struct Envelope {
    event_id: EventId,
    source_id: MachineId,
    target_id: MachineId,
    name: String,
    payload: Option<serde_json::Value>,
    delivery_mode: DeliveryMode,
    deadline: Option<Instant>,
}

impl Envelope {
    /// Construct a new envelope. `deadline` must be `None` only for
    /// `FireAndForget` and `InternalDeferred` envelopes.
    pub fn new(
        source_id: MachineId,
        target_id: MachineId,
        name: impl Into<String>,
        payload: Option<serde_json::Value>,
        delivery_mode: DeliveryMode,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            source_id,
            target_id,
            name: name.into(),
            payload,
            delivery_mode,
            deadline,
        }
    }

    /// Unique id for this submission.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Origin identity; may be [`MachineId::EXTERNAL`].
    pub fn source_id(&self) -> &MachineId {
        &self.source_id
    }

    /// Registered machine this envelope targets.
    pub fn target_id(&self) -> &MachineId {
        &self.target_id
    }

    /// Event name dispatched to the interpreter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque payload, passed through without interpretation.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    /// How this envelope's outcome is communicated.
    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    /// Absolute deadline, absent for fire-and-forget and deferred sends.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether `now` is already past this envelope's deadline.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Whether this envelope expects a published result at all (i.e. a
    /// correlation slot may be waiting on it).
    pub fn expects_response(&self) -> bool {
        matches!(self.delivery_mode, DeliveryMode::AwaitResult)
    }
}

/// The outcome of processing one envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResult {
    /// Whether the event was processed and the interpreter reported
    /// success.
    pub success: bool,
    /// Active state set after processing, or empty on failure.
    pub new_state: String,
    /// Taxonomy tag for failures; meaningless when `success` is true.
    pub error_kind: Option<ErrorKind>,
    /// Human-readable failure description; empty when `success` is true.
    pub error_message: String,
    /// Index of the bus that processed (or attempted to process) this
    /// event.
    pub processed_by: Option<usize>,
    /// The envelope id this result answers.
    pub event_id: EventId,
}

impl EventResult {
    /// A successful result.
    pub fn success(event_id: EventId, new_state: impl Into<String>, processed_by: usize) -> Self {
        Self {
            success: true,
            new_state: new_state.into(),
            error_kind: None,
            error_message: String::new(),
            processed_by: Some(processed_by),
            event_id,
        }
    }

    /// A failed result tagged with a stable error kind.
    pub fn failure(event_id: EventId, kind: ErrorKind, processed_by: Option<usize>) -> Self {
        Self {
            success: false,
            new_state: String::new(),
            error_kind: Some(kind),
            error_message: kind.message().to_string(),
            processed_by,
            event_id,
        }
    }

    /// A failed result with a caller-supplied message, for
    /// `ActionException`/`InvalidConfig` cases where the interpreter's own
    /// text is more useful than the generic one.
    pub fn failure_with_message(
        event_id: EventId,
        kind: ErrorKind,
        message: impl Into<String>,
        processed_by: usize,
    ) -> Self {
        Self {
            success: false,
            new_state: String::new(),
            error_kind: Some(kind),
            error_message: message.into(),
            processed_by: Some(processed_by),
            event_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mid(s: &str) -> MachineId {
        MachineId::from(s)
    }

    #[test]
    fn fire_and_forget_has_no_deadline_and_no_response() {
        let env = Envelope::new(mid("external"), mid("m1"), "START", None, DeliveryMode::FireAndForget, None);
        assert_eq!(env.deadline(), None);
        assert!(!env.expects_response());
    }

    #[test]
    fn await_result_expects_response() {
        let env = Envelope::new(
            mid("external"),
            mid("m1"),
            "START",
            None,
            DeliveryMode::AwaitResult,
            Some(Instant::now()),
        );
        assert!(env.expects_response());
    }
}
