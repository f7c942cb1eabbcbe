//! Deferred-send collector (C5, spec.md §4.5).
//!
//! Action code running inside the interpreter must never call back into
//! the orchestrator synchronously — doing so could block a worker while it
//! waits on another bus and could close a waits-for cycle. Instead, action
//! invocations receive this narrow capability: a write-only buffer the
//! worker drains after `dispatch` returns.

use std::sync::Mutex;

use crate::ids::MachineId;

/// A single cross-machine send requested from inside an action.
#[derive(Debug, Clone)]
pub struct DeferredSend {
    /// The machine the send targets.
    pub target_id: MachineId,
    /// Event name.
    pub name: String,
    /// Opaque payload.
    pub payload: Option<serde_json::Value>,
}

/// Capability passed to `MachineInterpreter::dispatch`.
///
/// Deliberately exposes no way to read a result, no reference to the
/// orchestrator, and no async surface: `requestSend`/`requestSelfSend` are
/// synchronous, non-suspending pushes onto a plain `std::sync::Mutex`-guarded
/// buffer, matching the constraint that an action callback "must not
/// suspend arbitrarily" (spec.md §5).
pub struct OrchestratedContext {
    current_machine: MachineId,
    buffer: Mutex<Vec<DeferredSend>>,
}

impl OrchestratedContext {
    /// Construct a fresh, empty context for one `dispatch` invocation on
    /// `current_machine`.
    pub fn new(current_machine: MachineId) -> Self {
        Self {
            current_machine,
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// The machine this invocation is dispatching on.
    pub fn current_machine(&self) -> &MachineId {
        &self.current_machine
    }

    /// Record a cross-machine send to be enqueued after `dispatch` returns.
    pub fn request_send(&self, target_id: MachineId, name: impl Into<String>, payload: Option<serde_json::Value>) {
        let mut buf = self.buffer.lock().expect("deferred-send buffer poisoned");
        buf.push(DeferredSend {
            target_id,
            name: name.into(),
            payload,
        });
    }

    /// Shorthand for `request_send(current_machine_id, ...)`.
    pub fn request_self_send(&self, name: impl Into<String>, payload: Option<serde_json::Value>) {
        let target = self.current_machine.clone();
        self.request_send(target, name, payload);
    }

    /// Drain the recorded sends in the order they were requested. Called
    /// exactly once, by the worker, after `dispatch` returns.
    pub fn drain(self) -> Vec<DeferredSend> {
        self.buffer.into_inner().expect("deferred-send buffer poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_sends_in_order() {
        let ctx = OrchestratedContext::new(MachineId::from("a"));
        ctx.request_send(MachineId::from("b"), "PING", None);
        ctx.request_self_send("TICK", None);
        ctx.request_send(MachineId::from("c"), "PONG", None);

        let sends = ctx.drain();
        assert_eq!(sends.len(), 3);
        assert_eq!(sends[0].target_id.as_str(), "b");
        assert_eq!(sends[1].target_id.as_str(), "a");
        assert_eq!(sends[2].target_id.as_str(), "c");
    }

    #[test]
    fn empty_context_drains_empty() {
        let ctx = OrchestratedContext::new(MachineId::from("a"));
        assert!(ctx.drain().is_empty());
    }
}
