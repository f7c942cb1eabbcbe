//! Hand-written toy interpreters used only by this crate's own tests.
//!
//! These are intentionally minimal — a handful of hardcoded states and
//! transitions, not a general FSM engine. The parser and interpreter that
//! would normally drive `MachineInterpreter` in a real deployment are
//! external collaborators out of scope for this crate (spec.md §1); this
//! module exists purely so the orchestrator's own test suite can exercise
//! real `dispatch` calls.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use toka_orchestrator_core::{DispatchOutcome, MachineId, MachineInterpreter, OrchestratedContext};

/// idle <-> running on START/STOP. Used for the basic-send scenario.
pub struct ToggleMachine {
    state: Mutex<&'static str>,
}

impl ToggleMachine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new("idle"),
        }
    }
}

impl MachineInterpreter for ToggleMachine {
    fn start(&self) {
        *self.state.lock().unwrap() = "idle";
    }

    fn dispatch(&self, name: &str, _payload: Option<&serde_json::Value>, _ctx: &OrchestratedContext) -> DispatchOutcome {
        let mut state = self.state.lock().unwrap();
        match (*state, name) {
            ("idle", "START") => *state = "running",
            ("running", "STOP") => *state = "idle",
            _ => {
                return DispatchOutcome::Rejected {
                    reason: format!("no transition for {name} from {state}"),
                }
            }
        }
        DispatchOutcome::Processed { active_states: state.to_string() }
    }

    fn active_state_names(&self) -> Vec<String> {
        vec![self.state.lock().unwrap().to_string()]
    }

    fn stop(&self) {}
}

/// Entry action of "counting" requests a self-send of `INC`; each `INC`
/// increments a counter and, while it remains below `limit`, requests
/// another self-send. Exercises the self-send chain scenario.
pub struct CounterMachine {
    counter: AtomicU32,
    limit: u32,
}

impl CounterMachine {
    pub fn new(limit: u32) -> Self {
        Self {
            counter: AtomicU32::new(0),
            limit,
        }
    }

    pub fn count(&self) -> u32 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl MachineInterpreter for CounterMachine {
    fn start(&self) {
        self.counter.store(0, Ordering::SeqCst);
    }

    fn dispatch(&self, name: &str, _payload: Option<&serde_json::Value>, ctx: &OrchestratedContext) -> DispatchOutcome {
        match name {
            "START" => {
                // Entry action of "counting": kick off the self-send chain.
                ctx.request_self_send("INC", None);
                DispatchOutcome::Processed { active_states: "counting".into() }
            }
            "INC" => {
                let next = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                if next < self.limit {
                    ctx.request_self_send("INC", None);
                }
                DispatchOutcome::Processed { active_states: "counting".into() }
            }
            other => DispatchOutcome::Rejected {
                reason: format!("unknown event {other}"),
            },
        }
    }

    fn active_state_names(&self) -> Vec<String> {
        vec!["counting".into()]
    }

    fn stop(&self) {}
}

/// On `PING`, requests a send of `PING` to `peer` exactly once (a bounded
/// forward, not an unconditional mutual loop — infinite self/peer-sending
/// is the author's responsibility to bound per spec.md §9). Used for the
/// bidirectional cross-machine scenario.
pub struct PingPongMachine {
    peer: MachineId,
    forwarded: AtomicBool,
    pinged: AtomicBool,
}

impl PingPongMachine {
    pub fn new(peer: MachineId) -> Self {
        Self {
            peer,
            forwarded: AtomicBool::new(false),
            pinged: AtomicBool::new(false),
        }
    }

    pub fn was_pinged(&self) -> bool {
        self.pinged.load(Ordering::SeqCst)
    }
}

impl MachineInterpreter for PingPongMachine {
    fn start(&self) {}

    fn dispatch(&self, name: &str, _payload: Option<&serde_json::Value>, ctx: &OrchestratedContext) -> DispatchOutcome {
        if name != "PING" {
            return DispatchOutcome::Rejected {
                reason: format!("unknown event {name}"),
            };
        }
        self.pinged.store(true, Ordering::SeqCst);
        if !self.forwarded.swap(true, Ordering::SeqCst) {
            ctx.request_send(self.peer.clone(), "PING", None);
        }
        DispatchOutcome::Processed { active_states: "acked".into() }
    }

    fn active_state_names(&self) -> Vec<String> {
        vec!["acked".into()]
    }

    fn stop(&self) {}
}

/// Forwards `TRIGGER` to `next` exactly once, tracking whether it has been
/// visited. Used for the circular-chain-of-100 scenario.
pub struct ChainMachine {
    next: MachineId,
    visited: AtomicBool,
}

impl ChainMachine {
    pub fn new(next: MachineId) -> Self {
        Self {
            next,
            visited: AtomicBool::new(false),
        }
    }

    pub fn was_visited(&self) -> bool {
        self.visited.load(Ordering::SeqCst)
    }
}

impl MachineInterpreter for ChainMachine {
    fn start(&self) {}

    fn dispatch(&self, name: &str, _payload: Option<&serde_json::Value>, ctx: &OrchestratedContext) -> DispatchOutcome {
        if name != "TRIGGER" {
            return DispatchOutcome::Rejected {
                reason: format!("unknown event {name}"),
            };
        }
        if !self.visited.swap(true, Ordering::SeqCst) {
            ctx.request_send(self.next.clone(), "TRIGGER", None);
        }
        DispatchOutcome::Processed { active_states: "triggered".into() }
    }

    fn active_state_names(&self) -> Vec<String> {
        vec!["triggered".into()]
    }

    fn stop(&self) {}
}

/// Records every dispatched event name, in the order `dispatch` was
/// called. Used to assert FIFO ordering is preserved across lifecycle
/// edges (e.g. events staged before `start()`).
pub struct RecorderMachine {
    seen: Mutex<Vec<String>>,
}

impl RecorderMachine {
    pub fn new() -> Self {
        Self { seen: Mutex::new(Vec::new()) }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl MachineInterpreter for RecorderMachine {
    fn start(&self) {}

    fn dispatch(&self, name: &str, _payload: Option<&serde_json::Value>, _ctx: &OrchestratedContext) -> DispatchOutcome {
        self.seen.lock().unwrap().push(name.to_string());
        DispatchOutcome::Processed { active_states: "recording".into() }
    }

    fn active_state_names(&self) -> Vec<String> {
        vec!["recording".into()]
    }

    fn stop(&self) {}
}

/// Blocks the dispatching worker for `delay` before reporting success.
/// Exercises timeout and backpressure scenarios, where a slow action must
/// still run synchronously on its worker.
pub struct SleepyMachine {
    delay: Duration,
}

impl SleepyMachine {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl MachineInterpreter for SleepyMachine {
    fn start(&self) {}

    fn dispatch(&self, _name: &str, _payload: Option<&serde_json::Value>, _ctx: &OrchestratedContext) -> DispatchOutcome {
        std::thread::sleep(self.delay);
        DispatchOutcome::Processed { active_states: "done".into() }
    }

    fn active_state_names(&self) -> Vec<String> {
        vec!["done".into()]
    }

    fn stop(&self) {}
}
