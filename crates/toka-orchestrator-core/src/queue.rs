//! Bounded per-bus FIFO queue (C2, spec.md §4.2).
//!
//! Built on `tokio::sync::mpsc`, the way the workspace's transport layer
//! builds its own bounded event queue: a fixed-capacity channel for
//! backpressure, `try_send` for the non-blocking producer path, and
//! `recv().await` for the single consumer.

use tokio::sync::mpsc;

use crate::envelope::Envelope;

/// Outcome of a non-blocking enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The envelope was accepted and is now queued.
    Accepted,
    /// The queue was at capacity; the envelope was not accepted.
    Full,
    /// The queue has been closed (orchestrator disposed or bus draining).
    Closed,
}

/// Sentinel returned by a woken `dequeue` when the queue has drained and
/// closed.
#[derive(Debug)]
pub enum Dequeued {
    /// The next envelope in FIFO order.
    Envelope(Envelope),
    /// The queue is closed and empty; the worker should stop.
    Closed,
}

/// The producer half of a bus queue. Cloned freely — `mpsc::Sender` is
/// itself cheaply cloneable and safe for concurrent use by many callers
/// and by other workers routing deferred sends.
#[derive(Clone)]
pub struct QueueProducer {
    tx: mpsc::Sender<Envelope>,
}

impl QueueProducer {
    /// Attempt to enqueue `envelope` without blocking. Never drops an
    /// envelope it reports as [`EnqueueOutcome::Accepted`].
    pub fn try_enqueue(&self, envelope: Envelope) -> EnqueueOutcome {
        match self.tx.try_send(envelope) {
            Ok(()) => EnqueueOutcome::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => EnqueueOutcome::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => EnqueueOutcome::Closed,
        }
    }

    /// Approximate current occupancy, used by admission control's
    /// watermark check. `mpsc` exposes no exact length; this reads the
    /// channel's available-capacity counter, which is exact for a bounded
    /// channel with a single consumer.
    pub fn approx_len(&self, capacity: usize) -> usize {
        capacity.saturating_sub(self.tx.capacity())
    }
}

/// The single-consumer half of a bus queue. Not cloneable — exactly one
/// worker owns a given bus's queue for its lifetime.
pub struct QueueConsumer {
    rx: mpsc::Receiver<Envelope>,
}

impl QueueConsumer {
    /// Wait for the next envelope, or for the queue to close.
    pub async fn dequeue(&mut self) -> Dequeued {
        match self.rx.recv().await {
            Some(envelope) => Dequeued::Envelope(envelope),
            None => Dequeued::Closed,
        }
    }
}

/// Create a bounded queue with the given capacity.
///
/// `enable_backpressure = false` is realized by the caller passing a very
/// large capacity rather than by branching logic here — keeping a single
/// code path for both modes (spec.md §4.2: "the queue behaves as if
/// capacity were effectively unbounded").
pub fn bounded(capacity: usize) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueProducer { tx }, QueueConsumer { rx })
}

/// Capacity used in place of `maxQueueDepth` when `enableBackpressure` is
/// false. Bounded rather than literally unbounded so a single channel
/// implementation serves both modes; chosen far above any realistic
/// workload so `full` is never observed in practice.
pub const UNBOUNDED_CAPACITY: usize = 1 << 20;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::DeliveryMode;
    use crate::ids::MachineId;

    fn envelope() -> Envelope {
        Envelope::new(
            MachineId::from("external"),
            MachineId::from("m1"),
            "PING",
            None,
            DeliveryMode::FireAndForget,
            None,
        )
    }

    #[tokio::test]
    async fn accepts_until_capacity_then_reports_full() {
        let (tx, mut rx) = bounded(2);
        assert_eq!(tx.try_enqueue(envelope()), EnqueueOutcome::Accepted);
        assert_eq!(tx.try_enqueue(envelope()), EnqueueOutcome::Accepted);
        assert_eq!(tx.try_enqueue(envelope()), EnqueueOutcome::Full);

        // Draining frees capacity again.
        matches!(rx.dequeue().await, Dequeued::Envelope(_));
        assert_eq!(tx.try_enqueue(envelope()), EnqueueOutcome::Accepted);
    }

    #[tokio::test]
    async fn closed_queue_rejects_and_wakes_consumer() {
        let (tx, mut rx) = bounded(4);
        drop(tx.clone());
        let producer_guard = tx;
        drop(producer_guard);
        match rx.dequeue().await {
            Dequeued::Closed => {}
            Dequeued::Envelope(_) => panic!("expected closed sentinel"),
        }
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let (tx, mut rx) = bounded(8);
        for i in 0..5 {
            let env = Envelope::new(
                MachineId::from("external"),
                MachineId::from("m1"),
                format!("EVT{i}"),
                None,
                DeliveryMode::FireAndForget,
                None,
            );
            assert_eq!(tx.try_enqueue(env), EnqueueOutcome::Accepted);
        }
        for i in 0..5 {
            match rx.dequeue().await {
                Dequeued::Envelope(env) => assert_eq!(env.name(), format!("EVT{i}")),
                Dequeued::Closed => panic!("queue closed early"),
            }
        }
    }
}
