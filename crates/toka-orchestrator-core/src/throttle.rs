//! Throttle & backpressure admission control (C7, spec.md §4.7).

use std::time::Duration;

use crate::envelope::DeliveryMode;
use crate::queue::QueueProducer;

/// What the router should do when `tryEnqueue` reports `full`, decided
/// purely from the envelope's delivery mode (spec.md §4.7's three-way
/// split).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullPolicy {
    /// `awaitResult`: synthesize a `QueueFull` failure result. No retry.
    FailResult,
    /// `fireAndForget`: reject the submission. No implicit retry.
    Reject,
    /// `internalDeferred`: drop silently and increment a counter. The
    /// originating action has already returned; the orchestrator does not
    /// unwind state to retry it.
    Drop,
}

/// Decide the full-policy for `mode`.
pub fn full_policy(mode: DeliveryMode) -> FullPolicy {
    match mode {
        DeliveryMode::AwaitResult => FullPolicy::FailResult,
        DeliveryMode::FireAndForget => FullPolicy::Reject,
        DeliveryMode::InternalDeferred => FullPolicy::Drop,
    }
}

/// Apply the cooperative throttle delay if `producer`'s observed depth is
/// at or above `watermark`.
///
/// This must only ever be awaited from the *caller's* task — never from
/// inside a worker — so that a congested bus slows its callers down
/// without ever blocking a worker thread (spec.md §4.7: "it must not
/// block a worker thread; only the caller's context pays the delay").
pub async fn apply_throttle(producer: &QueueProducer, capacity: usize, watermark: usize, delay: Duration) {
    if producer.approx_len(capacity) >= watermark {
        tokio::time::sleep(delay).await;
    }
}
