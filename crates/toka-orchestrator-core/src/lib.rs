#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **toka-orchestrator-core** – Deadlock-free event bus orchestrator for
//! the Toka finite-state-machine runtime.
//!
//! This crate is the hardest engineering in the Toka FSM stack: it
//! serializes execution per machine, distributes work across a pool of
//! event buses, prevents the deadlocks that arise when machines send
//! events to one another from inside action callbacks, and provides
//! bounded queueing with backpressure under overload.
//!
//! ## Architecture
//!
//! - [`Envelope`] / [`EventResult`] — immutable request/response records (C1).
//! - [`queue`] — bounded, non-blocking per-bus FIFO (C2).
//! - [`EventBusWorker`] — the single-threaded loop draining one bus (C3).
//! - [`Router`] — hash-routed bus pool and machine registry (C4).
//! - [`OrchestratedContext`] — the deferred-send collector passed to
//!   action code (C5).
//! - [`Orchestrator`] — the public facade: send, send-and-wait,
//!   fire-and-forget, correlation, timeouts (C6).
//! - [`throttle`] — admission control and backpressure policy (C7).
//! - [`ObserverHook`] — counters and trace callbacks, no sinks (C8).
//!
//! The core consumes a minimal [`MachineInterpreter`] contract and never
//! parses JSON, manages transition tables, or talks to observability
//! sinks directly — those are the embedding application's responsibility.
//!
//! ## Deadlock-freedom
//!
//! A worker never synchronously invokes another machine and never waits
//! on another bus's progress. Cross-machine sends requested from inside
//! an action are recorded on an [`OrchestratedContext`] and flushed onto
//! the router only after `dispatch` returns. The call graph through
//! queues is therefore acyclic in time even when the logical machine
//! graph has cycles.

mod config;
mod context;
mod correlation;
mod envelope;
mod error;
mod ids;
mod interpreter;
mod observer;
/// Bounded per-bus FIFO queue primitives (C2).
pub mod queue;
mod registry;
mod router;
/// Snapshot types returned by [`Orchestrator::stats`].
pub mod stats;
mod throttle;
mod worker;

mod orchestrator;

pub use config::OrchestratorConfig;
pub use context::{DeferredSend, OrchestratedContext};
pub use correlation::CorrelationTable;
pub use envelope::{DeliveryMode, Envelope, EventResult};
pub use error::{ErrorKind, OrchestratorError};
pub use ids::{EventId, MachineId};
pub use interpreter::{DispatchOutcome, MachineInterpreter};
pub use observer::{NoopHook, ObserverHook, TracingHook};
pub use orchestrator::{AcceptOutcome, Orchestrator};
pub use registry::{LifecycleState, MachineRecord};
pub use router::Router;
pub use stats::{BusStats, OrchestratorStats};
pub use throttle::{full_policy, FullPolicy};
pub use worker::EventBusWorker;
