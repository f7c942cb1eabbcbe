//! Bus pool & router (C4, spec.md §4.4).
//!
//! Construction pre-creates exactly `poolSize` buses. The router owns the
//! machine registry and the hash that assigns each machine to its
//! permanent bus, mirroring `toka-agent-runtime::AgentProcessManager`'s
//! `DashMap`-backed registry shape.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::envelope::Envelope;
use crate::error::{ErrorKind, OrchestratorError};
use crate::ids::MachineId;
use crate::interpreter::MachineInterpreter;
use crate::queue::{self, EnqueueOutcome, QueueConsumer, QueueProducer};
use crate::registry::{LifecycleState, MachineRecord};
use crate::stats::{BusCounters, BusStats};
use crate::throttle::{apply_throttle, full_policy, FullPolicy};

/// Outcome of routing one envelope toward its target bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The envelope was accepted onto its target bus's queue.
    Enqueued,
    /// Admission was denied; the caller should surface this kind (or, for
    /// deferred sends, silently count it).
    Rejected(ErrorKind),
}

/// Per-bus state the router needs: its producer handle (closable on
/// dispose), capacity, and counters.
struct BusHandle {
    producer: Mutex<Option<QueueProducer>>,
    capacity: usize,
    counters: Arc<BusCounters>,
}

/// Pre-creates `pool_size` bounded queues and owns the machine registry.
/// Routing is O(1): a stable hash of the machine id, computed with a
/// `RandomState` fixed at construction, selects the permanent bus index.
pub struct Router {
    buses: Vec<BusHandle>,
    registry: DashMap<MachineId, Arc<MachineRecord>>,
    hash_builder: RandomState,
    pool_size: usize,
    draining: AtomicBool,
}

impl Router {
    /// Construct a router with `pool_size` buses, each bounded at
    /// `capacity`. Returns the consumer half of every queue so the caller
    /// can spawn one worker task per bus.
    pub fn new(pool_size: usize, capacity: usize) -> (Arc<Self>, Vec<QueueConsumer>) {
        let mut handles = Vec::with_capacity(pool_size);
        let mut consumers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let (producer, consumer) = queue::bounded(capacity);
            handles.push(BusHandle {
                producer: Mutex::new(Some(producer)),
                capacity,
                counters: Arc::new(BusCounters::default()),
            });
            consumers.push(consumer);
        }

        let router = Arc::new(Self {
            buses: handles,
            registry: DashMap::new(),
            hash_builder: RandomState::new(),
            pool_size,
            draining: AtomicBool::new(false),
        });
        (router, consumers)
    }

    /// Stable hash of `id` modulo `pool_size`. The same id always lands on
    /// the same bus for the router's lifetime.
    pub fn bus_index_for(&self, id: &MachineId) -> usize {
        let mut hasher = self.hash_builder.build_hasher();
        id.hash(&mut hasher);
        (hasher.finish() as usize) % self.pool_size
    }

    /// This bus's counters, for the worker owning it to update.
    pub fn counters(&self, bus_index: usize) -> Arc<BusCounters> {
        Arc::clone(&self.buses[bus_index].counters)
    }

    /// Idempotent registration: re-registering the same id with the same
    /// interpreter (by `Arc` identity) succeeds; a different interpreter
    /// is rejected.
    pub fn register_machine(
        &self,
        id: MachineId,
        interpreter: Arc<dyn MachineInterpreter>,
    ) -> Result<Arc<MachineRecord>, OrchestratorError> {
        let bus_index = self.bus_index_for(&id);
        use dashmap::mapref::entry::Entry;
        match self.registry.entry(id.clone()) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if Arc::ptr_eq(existing.interpreter(), &interpreter) {
                    Ok(Arc::clone(existing))
                } else {
                    Err(OrchestratorError::DuplicateId(id))
                }
            }
            Entry::Vacant(entry) => {
                let record = Arc::new(MachineRecord::new(id, interpreter, bus_index));
                entry.insert(Arc::clone(&record));
                Ok(record)
            }
        }
    }

    /// Look up a machine's record.
    pub fn machine(&self, id: &MachineId) -> Option<Arc<MachineRecord>> {
        self.registry.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drive `interpreter.start()`, flip the machine to `Started`, and
    /// re-enqueue every envelope staged for it while it was still
    /// `Registered`, in the order it was staged (spec.md §4.6: events
    /// enqueued before start are processed after start, in arrival
    /// order).
    pub fn start_machine(&self, id: &MachineId) -> Result<(), OrchestratorError> {
        let record = self.machine(id).ok_or_else(|| OrchestratorError::NotRegistered(id.clone()))?;
        record.interpreter().start();
        let staged = record.take_pending_and_start();
        for envelope in staged {
            // These already passed admission control once; route_deferred
            // never blocks and is safe to call from outside a worker too.
            if matches!(self.route_deferred(envelope), RouteOutcome::Rejected(_)) {
                self.counters(record.bus_index()).record_deferred_dropped();
            }
        }
        Ok(())
    }

    /// Stop a machine. Idempotent if already stopped.
    pub fn stop_machine(&self, id: &MachineId) -> Result<(), OrchestratorError> {
        let record = self.machine(id).ok_or_else(|| OrchestratorError::NotRegistered(id.clone()))?;
        record.interpreter().stop();
        record.mark_stopped();
        Ok(())
    }

    /// Transition every currently registered machine to `Disposed`.
    /// Called once by `Orchestrator::dispose` after every bus has fully
    /// drained, so this only affects post-drain bookkeeping (`stats()`,
    /// lifecycle reporting) and never causes an in-flight envelope to be
    /// rejected that the drain contract (spec.md §4.6 state machine)
    /// requires be processed.
    pub fn mark_all_disposed(&self) {
        for entry in self.registry.iter() {
            entry.value().mark_disposed();
        }
    }

    /// Number of currently registered machines.
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Snapshot every bus's counters.
    pub fn bus_stats(&self) -> Vec<BusStats> {
        self.buses
            .iter()
            .enumerate()
            .map(|(index, bus)| {
                let queued_depth = bus
                    .producer
                    .lock()
                    .expect("bus producer mutex poisoned")
                    .as_ref()
                    .map(|p| p.approx_len(bus.capacity))
                    .unwrap_or(0);
                BusStats {
                    index,
                    total_processed: bus.counters.total_processed(),
                    queued_depth,
                    deferred_dropped: bus.counters.deferred_dropped(),
                }
            })
            .collect()
    }

    /// Route an envelope submitted from outside a worker (`sendAndWait` /
    /// `sendFireAndForget`). May cooperatively sleep for `throttle_delay`
    /// in the *caller's* task before attempting to enqueue.
    pub async fn route(
        &self,
        envelope: Envelope,
        throttle_watermark: usize,
        throttle_delay: std::time::Duration,
    ) -> RouteOutcome {
        if self.draining.load(Ordering::Acquire) {
            return RouteOutcome::Rejected(ErrorKind::Shutdown);
        }
        let Some(record) = self.machine(envelope.target_id()) else {
            return RouteOutcome::Rejected(ErrorKind::NotRegistered);
        };
        if matches!(record.lifecycle(), LifecycleState::Stopped | LifecycleState::Disposed) {
            return RouteOutcome::Rejected(ErrorKind::MachineStopped);
        }

        let bus = &self.buses[record.bus_index()];
        let producer = bus.producer.lock().expect("bus producer mutex poisoned").clone();
        let Some(producer) = producer else {
            return RouteOutcome::Rejected(ErrorKind::Shutdown);
        };

        apply_throttle(&producer, bus.capacity, throttle_watermark, throttle_delay).await;

        match producer.try_enqueue(envelope) {
            EnqueueOutcome::Accepted => RouteOutcome::Enqueued,
            EnqueueOutcome::Full => RouteOutcome::Rejected(ErrorKind::QueueFull),
            EnqueueOutcome::Closed => RouteOutcome::Rejected(ErrorKind::Shutdown),
        }
    }

    /// Route a deferred (`internalDeferred`) send on behalf of a worker.
    /// Never awaits: a worker must never suspend on another bus's state.
    /// Per spec.md §4.7, a full target queue causes the send to be
    /// silently dropped — the caller (the worker flushing its deferred
    /// buffer) is responsible for incrementing its own drop counter.
    pub fn route_deferred(&self, envelope: Envelope) -> RouteOutcome {
        if self.draining.load(Ordering::Acquire) {
            return RouteOutcome::Rejected(ErrorKind::Shutdown);
        }
        let Some(record) = self.machine(envelope.target_id()) else {
            return RouteOutcome::Rejected(ErrorKind::NotRegistered);
        };
        if matches!(record.lifecycle(), LifecycleState::Stopped | LifecycleState::Disposed) {
            return RouteOutcome::Rejected(ErrorKind::MachineStopped);
        }
        let bus = &self.buses[record.bus_index()];
        let producer = bus.producer.lock().expect("bus producer mutex poisoned").clone();
        let Some(producer) = producer else {
            return RouteOutcome::Rejected(ErrorKind::Shutdown);
        };
        match producer.try_enqueue(envelope) {
            EnqueueOutcome::Accepted => RouteOutcome::Enqueued,
            EnqueueOutcome::Full => RouteOutcome::Rejected(full_policy_kind()),
            EnqueueOutcome::Closed => RouteOutcome::Rejected(ErrorKind::Shutdown),
        }
    }

    /// Approximate current occupancy of a single bus's queue, used by
    /// worker stat reporting without snapshotting the whole pool.
    pub fn queue_len(&self, bus_index: usize) -> usize {
        let bus = &self.buses[bus_index];
        bus.producer
            .lock()
            .expect("bus producer mutex poisoned")
            .as_ref()
            .map(|p| p.approx_len(bus.capacity))
            .unwrap_or(0)
    }

    /// Begin draining: reject all new submissions and close every bus's
    /// producer so already-queued items are the last each worker will
    /// ever see.
    pub fn begin_dispose(&self) {
        self.draining.store(true, Ordering::Release);
        for bus in &self.buses {
            *bus.producer.lock().expect("bus producer mutex poisoned") = None;
        }
    }
}

fn full_policy_kind() -> ErrorKind {
    // InternalDeferred always drops under full; this is just the tag used
    // for counting, not surfaced to any caller.
    debug_assert!(matches!(full_policy(crate::envelope::DeliveryMode::InternalDeferred), FullPolicy::Drop));
    ErrorKind::QueueFull
}
