//! Error taxonomy (spec.md §7) and caller-time construction/registration
//! failures.

use serde::{Deserialize, Serialize};

/// Stable, surfaced error kinds carried on [`crate::envelope::EventResult`].
///
/// These are the seven tags from spec.md §7. They are data, not
/// `std::error::Error` impls, because a failed send is a normal outcome the
/// caller inspects, not an exceptional control-flow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Target id unknown to the registry.
    NotRegistered,
    /// Target present but stopped or disposed.
    MachineStopped,
    /// Admission denied under backpressure.
    QueueFull,
    /// Deadline elapsed before the worker published a result.
    Timeout,
    /// Orchestrator is draining or disposed.
    Shutdown,
    /// Interpreter rejected the event as structurally invalid.
    InvalidConfig,
    /// An action callback raised during `dispatch`; the worker recovered.
    ActionException,
}

impl ErrorKind {
    /// Human-readable description, used when synthesizing `errorMessage`.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::NotRegistered => "target machine is not registered",
            ErrorKind::MachineStopped => "target machine is stopped or disposed",
            ErrorKind::QueueFull => "target bus queue is at capacity",
            ErrorKind::Timeout => "deadline elapsed before a result was published",
            ErrorKind::Shutdown => "orchestrator is draining or disposed",
            ErrorKind::InvalidConfig => "interpreter rejected the event as structurally invalid",
            ErrorKind::ActionException => "an action callback raised during dispatch",
        }
    }
}

/// Caller-time failures that never become an [`ErrorKind`] on a result,
/// because they are rejected before an envelope would ever be constructed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrchestratorError {
    /// `register` was called with an id already bound to a different
    /// interpreter.
    #[error("machine {0:?} is already registered with a different interpreter")]
    DuplicateId(crate::ids::MachineId),
    /// A lifecycle operation (`start`/`stop`) targeted an unknown id.
    #[error("machine {0:?} is not registered")]
    NotRegistered(crate::ids::MachineId),
    /// Configuration values were internally inconsistent (e.g. zero pool
    /// size).
    #[error("invalid orchestrator configuration: {0}")]
    InvalidConfig(String),
}
