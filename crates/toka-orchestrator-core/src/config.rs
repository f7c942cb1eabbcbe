//! Orchestrator configuration (spec.md §3, "Orchestrator configuration").

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// Construction-time configuration for an [`crate::Orchestrator`].
///
/// Mirrors `toka_runtime::RuntimeConfig`'s shape: a plain, `serde`-derived
/// struct with a `Default` impl carrying reasonable out-of-the-box values,
/// deserializable from the host application's own config file or env
/// layer (the core itself does not read files or environment variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of event buses created at construction; fixed for the
    /// orchestrator's lifetime.
    pub pool_size: usize,
    /// If true, queues are bounded and enqueue returns a "full" signal; if
    /// false, queues are effectively unbounded.
    pub enable_backpressure: bool,
    /// Capacity of each bounded queue.
    pub max_queue_depth: usize,
    /// Minimum wait applied by admission control when a queue is near
    /// capacity.
    pub throttle_delay: Duration,
    /// Gate for counter updates (hot-path cost).
    pub enable_metrics: bool,
    /// Gate for trace emission.
    pub enable_logging: bool,
    /// Deadline applied to `sendAndWait` when the caller omits one.
    pub default_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            enable_backpressure: true,
            max_queue_depth: 256,
            throttle_delay: Duration::from_millis(5),
            enable_metrics: true,
            enable_logging: true,
            default_timeout: Duration::from_secs(5),
        }
    }
}

impl OrchestratorConfig {
    /// Validate internal consistency before the orchestrator is built.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.pool_size == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "pool_size must be at least 1".into(),
            ));
        }
        if self.enable_backpressure && self.max_queue_depth == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "max_queue_depth must be at least 1 when backpressure is enabled".into(),
            ));
        }
        Ok(())
    }

    /// The watermark (in queue items) at or above which admission control
    /// applies `throttle_delay` before attempting to enqueue (spec.md
    /// §4.7: "≥ 90% of maxQueueDepth").
    pub fn throttle_watermark(&self) -> usize {
        (self.max_queue_depth * 9) / 10
    }
}
