//! Scenarios 1, 2, 6 from spec.md §8: basic send, self-send chain, and
//! timeout.

mod support;

use std::sync::Arc;
use std::time::Duration;

use toka_orchestrator_core::{ErrorKind, OrchestratorConfig};
use support::{CounterMachine, SleepyMachine, ToggleMachine};

#[tokio::test]
async fn basic_send_transitions_and_returns_new_state() {
    let orch = toka_orchestrator_core::Orchestrator::new(OrchestratorConfig::default()).unwrap();
    orch.register("m1", Arc::new(ToggleMachine::new())).unwrap();
    orch.start("m1").unwrap();

    let result = orch.send("external", "m1", "START", None, None).await;
    assert!(result.success);
    assert_eq!(result.new_state, "running");

    orch.dispose().await;
}

#[tokio::test]
async fn self_send_chain_runs_to_completion() {
    let orch = toka_orchestrator_core::Orchestrator::new(OrchestratorConfig::default()).unwrap();
    let machine = Arc::new(CounterMachine::new(5));
    orch.register("counter", Arc::clone(&machine) as Arc<dyn toka_orchestrator_core::MachineInterpreter>)
        .unwrap();
    orch.start("counter").unwrap();

    let result = orch.send("external", "counter", "START", None, None).await;
    assert!(result.success);

    // The chain of self-sends runs on the same bus after this call
    // returns; give the worker a moment to drain it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(machine.count(), 5);

    orch.dispose().await;
}

#[tokio::test]
async fn zero_timeout_resolves_immediately_without_touching_the_queue() {
    let orch = toka_orchestrator_core::Orchestrator::new(OrchestratorConfig::default()).unwrap();
    orch.register("m1", Arc::new(ToggleMachine::new())).unwrap();
    orch.start("m1").unwrap();

    let result = orch
        .send("external", "m1", "START", None, Some(Duration::ZERO))
        .await;
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Timeout));

    orch.dispose().await;
}

#[tokio::test]
async fn short_timeout_then_longer_timeout_eventually_succeeds() {
    // Scenario 6: a 500ms action invoked with timeout=100 times out; a
    // follow-up with timeout=2000 on the same target eventually succeeds.
    let orch = toka_orchestrator_core::Orchestrator::new(OrchestratorConfig::default()).unwrap();
    orch.register("slow", Arc::new(SleepyMachine::new(Duration::from_millis(500))))
        .unwrap();
    orch.start("slow").unwrap();

    let first = orch
        .send("external", "slow", "GO", None, Some(Duration::from_millis(100)))
        .await;
    assert!(!first.success);
    assert_eq!(first.error_kind, Some(ErrorKind::Timeout));

    let second = orch
        .send("external", "slow", "GO", None, Some(Duration::from_millis(2000)))
        .await;
    assert!(second.success);

    orch.dispose().await;
}

#[tokio::test]
async fn sending_to_unregistered_machine_fails_fast() {
    let orch = toka_orchestrator_core::Orchestrator::new(OrchestratorConfig::default()).unwrap();
    let result = orch.send("external", "ghost", "START", None, None).await;
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::NotRegistered));
    orch.dispose().await;
}

#[tokio::test]
async fn events_for_a_registered_but_not_started_machine_wait_for_start() {
    let orch = toka_orchestrator_core::Orchestrator::new(OrchestratorConfig::default()).unwrap();
    orch.register("late", Arc::new(ToggleMachine::new())).unwrap();

    // Fire the send concurrently with a delayed start: it must resolve
    // successfully once start() runs, not be rejected up front.
    let orch2 = Arc::clone(&orch);
    let send = tokio::spawn(async move {
        orch2
            .send("external", "late", "START", None, Some(Duration::from_secs(2)))
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    orch.start("late").unwrap();

    let result = send.await.unwrap();
    assert!(result.success);
    orch.dispose().await;
}
