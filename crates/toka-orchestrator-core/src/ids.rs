//! Opaque identifiers used throughout the orchestrator.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a registered machine, or a conventional external caller.
///
/// Cheaply cloneable (`Arc<str>`) because it is copied into every envelope,
/// registry entry, and deferred send recorded on a bus.
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(Arc<str>);

impl MachineId {
    /// The conventional source id used for calls that originate outside any
    /// registered machine.
    pub const EXTERNAL: &'static str = "external";

    /// Construct a machine id from any string-like value.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MachineId {
    fn from(s: &str) -> Self {
        Self::new(Arc::<str>::from(s))
    }
}

impl From<String> for MachineId {
    fn from(s: String) -> Self {
        Self::new(Arc::<str>::from(s.as_str()))
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MachineId({})", self.0)
    }
}

/// Globally unique identifier for a single envelope submission.
///
/// Unique per orchestrator instance for the instance's lifetime (spec.md
/// §3's "eventId is globally unique per orchestrator instance").
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Mint a fresh, unique event id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_ids_compare_bytewise() {
        let a = MachineId::from("m1");
        let b = MachineId::from("m1".to_string());
        assert_eq!(a, b);
        assert_ne!(a, MachineId::from("m2"));
    }

    #[test]
    fn event_ids_are_unique() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
    }
}
