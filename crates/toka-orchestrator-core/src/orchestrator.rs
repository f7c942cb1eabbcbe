//! Orchestrator facade (C6, spec.md §4.6).
//!
//! The public entry point: register/start/stop machines, send events
//! (waiting for a result or fire-and-forget), read stats, and dispose.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::OrchestratorConfig;
use crate::correlation::CorrelationTable;
use crate::envelope::{DeliveryMode, Envelope, EventResult};
use crate::error::{ErrorKind, OrchestratorError};
use crate::ids::MachineId;
use crate::interpreter::MachineInterpreter;
use crate::observer::{NoopHook, ObserverHook};
use crate::queue::UNBOUNDED_CAPACITY;
use crate::router::{RouteOutcome, Router};
use crate::stats::OrchestratorStats;
use crate::worker::EventBusWorker;

/// Outcome of a `sendFireAndForget` submission: only an accept/reject
/// indication is ever returned (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The envelope was accepted onto its target bus.
    Accepted,
    /// Admission was denied; carries the reason.
    Rejected(ErrorKind),
}

/// The event bus orchestrator. Constructed once per independent runtime —
/// machine ids are only unique within one instance; multiple orchestrators
/// may coexist with no shared state (spec.md §9, "Global state").
pub struct Orchestrator {
    router: Arc<Router>,
    correlation: Arc<CorrelationTable>,
    config: Arc<OrchestratorConfig>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Build an orchestrator with the default [`NoopHook`] observer.
    ///
    /// Must be called from within a running Tokio runtime: construction
    /// spawns one worker task per bus.
    pub fn new(config: OrchestratorConfig) -> Result<Arc<Self>, OrchestratorError> {
        Self::with_observer(config, Arc::new(NoopHook))
    }

    /// Build an orchestrator wired to a custom [`ObserverHook`].
    pub fn with_observer(config: OrchestratorConfig, observer: Arc<dyn ObserverHook>) -> Result<Arc<Self>, OrchestratorError> {
        config.validate()?;
        let config = Arc::new(config);
        let capacity = if config.enable_backpressure {
            config.max_queue_depth
        } else {
            UNBOUNDED_CAPACITY
        };

        let (router, consumers) = Router::new(config.pool_size, capacity);
        let correlation = Arc::new(CorrelationTable::new());

        let mut workers = Vec::with_capacity(consumers.len());
        for (index, consumer) in consumers.into_iter().enumerate() {
            let worker = EventBusWorker::new(
                index,
                consumer,
                Arc::clone(&router),
                Arc::clone(&correlation),
                Arc::clone(&config),
                Arc::clone(&observer),
                router.counters(index),
            );
            workers.push(tokio::spawn(worker.run()));
        }

        Ok(Arc::new(Self {
            router,
            correlation,
            config,
            workers: Mutex::new(workers),
        }))
    }

    /// Register a machine under `id`, bound permanently to a bus chosen by
    /// hash. Idempotent for a repeat registration of the same interpreter;
    /// fails with [`OrchestratorError::DuplicateId`] for a different one.
    pub fn register(&self, id: impl Into<MachineId>, interpreter: Arc<dyn MachineInterpreter>) -> Result<(), OrchestratorError> {
        self.router.register_machine(id.into(), interpreter).map(|_| ())
    }

    /// Drive the interpreter's `start()` and flip the machine to
    /// `started`. Events enqueued before this call are processed after it,
    /// in the order they arrived.
    pub fn start(&self, id: impl Into<MachineId>) -> Result<(), OrchestratorError> {
        self.router.start_machine(&id.into())
    }

    /// Stop a machine. Idempotent if already stopped.
    pub fn stop(&self, id: impl Into<MachineId>) -> Result<(), OrchestratorError> {
        self.router.stop_machine(&id.into())
    }

    /// Send an event and wait for its result, or for `timeout` to elapse
    /// (defaulting to the configured `default_timeout`).
    ///
    /// `timeout = Duration::ZERO` always resolves to `Timeout` without
    /// waiting on the queue or the worker — race-free, per spec.md §8.
    pub async fn send(
        &self,
        source: impl Into<MachineId>,
        target: impl Into<MachineId>,
        name: impl Into<String>,
        payload: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> EventResult {
        let timeout = timeout.unwrap_or(self.config.default_timeout);
        let deadline = Instant::now() + timeout;
        let envelope = Envelope::new(source.into(), target.into(), name, payload, DeliveryMode::AwaitResult, Some(deadline));
        let event_id = envelope.event_id();

        if Instant::now() >= deadline {
            return EventResult::failure(event_id, ErrorKind::Timeout, None);
        }

        let rx = self.correlation.allocate(event_id);
        match self
            .router
            .route(envelope, self.config.throttle_watermark(), self.config.throttle_delay)
            .await
        {
            RouteOutcome::Enqueued => {}
            RouteOutcome::Rejected(kind) => {
                self.correlation.cancel(event_id);
                return EventResult::failure(event_id, kind, None);
            }
        }

        tokio::select! {
            biased;
            result = rx => result.unwrap_or_else(|_| EventResult::failure(event_id, ErrorKind::Shutdown, None)),
            _ = tokio::time::sleep_until(deadline) => {
                self.correlation.cancel(event_id);
                EventResult::failure(event_id, ErrorKind::Timeout, None)
            }
        }
    }

    /// Submit an event without waiting for a result; the caller receives
    /// only an accept/reject indication.
    pub async fn send_fire_and_forget(
        &self,
        source: impl Into<MachineId>,
        target: impl Into<MachineId>,
        name: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> AcceptOutcome {
        let envelope = Envelope::new(source.into(), target.into(), name, payload, DeliveryMode::FireAndForget, None);
        match self
            .router
            .route(envelope, self.config.throttle_watermark(), self.config.throttle_delay)
            .await
        {
            RouteOutcome::Enqueued => AcceptOutcome::Accepted,
            RouteOutcome::Rejected(kind) => AcceptOutcome::Rejected(kind),
        }
    }

    /// Snapshot of registered count, per-bus counters, and pending
    /// correlations.
    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            registered_count: self.router.registered_count(),
            buses: self.router.bus_stats(),
            pending_correlations: self.correlation.pending_count(),
        }
    }

    /// Drain every bus, refuse new submissions, and resolve every
    /// outstanding correlation slot with `shutdown`. Idempotent.
    pub async fn dispose(&self) {
        self.router.begin_dispose();
        self.correlation.cancel_all_with_shutdown();

        let handles = {
            let mut guard = self.workers.lock().expect("workers mutex poisoned");
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            let _ = handle.await;
        }

        // Only after every bus has fully drained do registered machines
        // flip to `Disposed`: the drain contract (spec.md §4.6 bus state
        // machine) requires already-queued items be processed normally,
        // which needs the `Started` lifecycle state intact while workers
        // are still running.
        self.router.mark_all_disposed();
    }
}
