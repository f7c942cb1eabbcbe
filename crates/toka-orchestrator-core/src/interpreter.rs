//! External interpreter contract (spec.md §6).
//!
//! The core never parses JSON and never manages transition tables, guards,
//! or action maps — that is the interpreter's responsibility. This module
//! only defines the narrow boundary the core calls across.

use crate::context::OrchestratedContext;

/// The result of one `dispatch` call.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The interpreter processed the event; `active_states` describes the
    /// active state set afterward.
    Processed {
        /// Active state set after processing, interpreter-defined format.
        active_states: String,
    },
    /// The interpreter rejected the event as structurally invalid (e.g. a
    /// malformed payload contract). Maps to `ErrorKind::InvalidConfig`.
    Rejected {
        /// Human-readable rejection reason.
        reason: String,
    },
}

/// The minimal contract every registered machine must implement.
///
/// `dispatch` is **synchronous** and must return promptly: it is invoked
/// directly on the owning bus's worker task, and the reentrancy rule
/// (spec.md §4.3, §5) depends on it never suspending or calling back into
/// the orchestrator other than through `ctx`.
pub trait MachineInterpreter: Send + Sync {
    /// Initialize the interpreter and compute its initial active state
    /// set. Called once by `startMachine`.
    fn start(&self);

    /// Process one event synchronously: compute transitions, invoke
    /// entry/exit actions with `ctx`, and report the active state set
    /// afterward (or a structured rejection).
    fn dispatch(&self, name: &str, payload: Option<&serde_json::Value>, ctx: &OrchestratedContext) -> DispatchOutcome;

    /// Observer: the interpreter's current active state set.
    fn active_state_names(&self) -> Vec<String>;

    /// Terminal. Subsequent `dispatch` calls must fail cleanly (the
    /// orchestrator enforces this at the registry level by refusing to
    /// route to a stopped machine, so interpreters are not required to
    /// re-check their own lifecycle state).
    fn stop(&self);
}
