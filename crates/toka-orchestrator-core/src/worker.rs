//! Event bus worker (C3, spec.md §4.3).
//!
//! One `tokio` task per bus, draining that bus's queue in a loop. A worker
//! never synchronously invokes another machine and never waits on another
//! bus's progress — the deadlock-freedom invariant (spec.md §5).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::instrument;

use crate::config::OrchestratorConfig;
use crate::context::OrchestratedContext;
use crate::correlation::CorrelationTable;
use crate::envelope::{DeliveryMode, Envelope, EventResult};
use crate::error::ErrorKind;
use crate::interpreter::DispatchOutcome;
use crate::observer::ObserverHook;
use crate::queue::{Dequeued, QueueConsumer};
use crate::registry::{LifecycleState, MachineRecord};
use crate::router::{RouteOutcome, Router};
use crate::stats::BusCounters;

/// Owns one bus's queue consumer and runs its processing loop.
pub struct EventBusWorker {
    index: usize,
    consumer: QueueConsumer,
    router: Arc<Router>,
    correlation: Arc<CorrelationTable>,
    config: Arc<OrchestratorConfig>,
    observer: Arc<dyn ObserverHook>,
    counters: Arc<BusCounters>,
}

impl EventBusWorker {
    /// Construct a worker for bus `index`.
    pub fn new(
        index: usize,
        consumer: QueueConsumer,
        router: Arc<Router>,
        correlation: Arc<CorrelationTable>,
        config: Arc<OrchestratorConfig>,
        observer: Arc<dyn ObserverHook>,
        counters: Arc<BusCounters>,
    ) -> Self {
        Self {
            index,
            consumer,
            router,
            correlation,
            config,
            observer,
            counters,
        }
    }

    /// Run the worker loop until the bus's queue closes (orchestrator
    /// disposed and fully drained).
    #[instrument(skip(self), fields(bus_index = self.index))]
    pub async fn run(mut self) {
        loop {
            match self.consumer.dequeue().await {
                Dequeued::Closed => {
                    tracing::debug!(bus_index = self.index, "bus drained, worker stopping");
                    return;
                }
                Dequeued::Envelope(envelope) => {
                    self.process(envelope).await;
                }
            }
        }
    }

    async fn process(&mut self, envelope: Envelope) {
        // Step 2: deadline-already-past check.
        if envelope.is_expired(Instant::now()) {
            let event_id = envelope.event_id();
            self.finish(envelope, EventResult::failure(event_id, ErrorKind::Timeout, Some(self.index)));
            return;
        }

        // Step 3: locate the machine record.
        let Some(record) = self.router.machine(envelope.target_id()) else {
            let event_id = envelope.event_id();
            self.finish(envelope, EventResult::failure(event_id, ErrorKind::NotRegistered, Some(self.index)));
            return;
        };

        // Lifecycle only ever moves forward (Registered -> Started ->
        // Stopped -> Disposed), so this loop runs at most twice: once for
        // the state observed on entry, and once more only if `start()`,
        // `stop()`, or `dispose()` raced ahead of us while we waited on
        // the staging lock inside `stage_if_not_started`.
        let mut envelope = envelope;
        loop {
            match record.lifecycle() {
                LifecycleState::Stopped | LifecycleState::Disposed => {
                    let event_id = envelope.event_id();
                    self.finish(envelope, EventResult::failure(event_id, ErrorKind::MachineStopped, Some(self.index)));
                    return;
                }
                LifecycleState::Registered => {
                    // Mandated behavior (spec.md §4.6, design notes open
                    // question): events for a registered-but-not-started
                    // machine enqueue and are processed after `start()`,
                    // never rejected. Stage it on the machine record
                    // itself (rather than requeuing onto the shared bus)
                    // so arrival order survives even if other envelopes
                    // for this same machine are queued behind it before
                    // `start()` runs.
                    match record.stage_if_not_started(envelope) {
                        None => return,
                        Some(handed_back) => {
                            envelope = handed_back;
                            continue;
                        }
                    }
                }
                LifecycleState::Started => {
                    self.dispatch_and_finish(envelope, &record).await;
                    return;
                }
            }
        }
    }

    /// Steps 4–6: synchronous dispatch isolated from action panics, the
    /// deferred-send flush, and publishing the result.
    async fn dispatch_and_finish(&mut self, envelope: Envelope, record: &Arc<MachineRecord>) {
        let ctx = OrchestratedContext::new(record.id().clone());
        let interpreter = Arc::clone(record.interpreter());
        let name = envelope.name().to_string();
        let payload = envelope.payload().cloned();
        let dispatch_result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            interpreter.dispatch(&name, payload.as_ref(), &ctx)
        }));

        let event_id = envelope.event_id();
        let result = match dispatch_result {
            Ok(DispatchOutcome::Processed { active_states }) => {
                EventResult::success(event_id, active_states, self.index)
            }
            Ok(DispatchOutcome::Rejected { reason }) => {
                EventResult::failure_with_message(event_id, ErrorKind::InvalidConfig, reason, self.index)
            }
            Err(panic) => {
                let message = panic_message(&panic);
                EventResult::failure_with_message(event_id, ErrorKind::ActionException, message, self.index)
            }
        };

        // Step 5: flush deferred sends recorded during dispatch, in order,
        // onto the router — never synchronously into another machine.
        let source_id = record.id().clone();
        for deferred in ctx.drain() {
            let deferred_envelope = Envelope::new(
                source_id.clone(),
                deferred.target_id,
                deferred.name,
                deferred.payload,
                DeliveryMode::InternalDeferred,
                None,
            );
            if matches!(self.router.route_deferred(deferred_envelope), RouteOutcome::Rejected(_)) {
                self.counters.record_deferred_dropped();
            }
        }

        // Step 6: publish and update counters.
        self.finish(envelope, result);
    }

    fn finish(&self, envelope: Envelope, result: EventResult) {
        if envelope.expects_response() {
            self.correlation.publish(envelope.event_id(), result.clone());
        }
        if self.config.enable_metrics {
            self.counters.record_processed();
        }
        if self.config.enable_metrics || self.config.enable_logging {
            self.observer.on_event(&envelope, &result);
            self.observer
                .on_bus_stat(self.index, self.counters.total_processed(), self.router.queue_len(self.index));
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "action callback panicked".to_string()
    }
}
