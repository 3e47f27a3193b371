// tests/heartbeat_loss.rs

mod common;
use crate::common::{
    FakeBehaviour, TestResult, WAIT, chain_registration, fast_heartbeats, harness_with,
    init_tracing, key, window,
};

use std::time::Duration;

use tokio::time::{sleep, timeout};

use orca::dag::{FailureKind, NodeState};
use orca::exec::HeartbeatTracker;
use orca::types::ExecutionStatus;

#[test]
fn tracker_fires_once_on_the_third_consecutive_miss() {
    let mut tracker = HeartbeatTracker::new(3);

    assert!(!tracker.record("P", false));
    assert!(!tracker.record("P", false));
    // A good heartbeat resets the streak.
    assert!(!tracker.record("P", true));
    assert_eq!(tracker.missed("P"), 0);

    assert!(!tracker.record("P", false));
    assert!(!tracker.record("P", false));
    assert!(tracker.record("P", false));
    assert!(!tracker.record("P", false));
    assert_eq!(tracker.missed("P"), 4);

    tracker.forget("P");
    assert_eq!(tracker.missed("P"), 0);
}

#[tokio::test]
async fn lost_processor_fails_outstanding_task_and_skips_dependents() -> TestResult {
    init_tracing();
    let h = harness_with(fast_heartbeats());
    h.coordinator.register_processor(chain_registration()).await?;
    h.transport.script(key("A"), FakeBehaviour::Hang);
    assert!(h.coordinator.start_health_monitor());

    let outcome = h.coordinator.emit_window_tracked(window("daily", "1")).await?;
    let execution = outcome.execution.expect("handle");
    timeout(WAIT, h.transport.wait_for_request("A")).await?;

    // The processor stops answering heartbeats; the task never reports.
    h.transport.set_alive("P", false);

    let summary = timeout(WAIT, execution.wait()).await??;
    assert_eq!(summary.status, ExecutionStatus::PartiallyFailed);
    assert_eq!(
        summary.state_of("A", "1"),
        Some(NodeState::Failed(FailureKind::Unhandled))
    );
    assert_eq!(summary.state_of("B", "1"), Some(NodeState::Skipped));

    let a = summary
        .results
        .iter()
        .find(|r| r.algorithm == key("A"))
        .expect("synthesized result for A");
    assert!(a.outcome.message.as_deref().unwrap_or_default().contains("lost"));

    assert!(!h.coordinator.registry().is_available("P"));
    assert_eq!(h.transport.requested_names(), vec!["A"]);

    h.coordinator.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn healthy_processor_stays_available() -> TestResult {
    init_tracing();
    let h = harness_with(fast_heartbeats());
    h.coordinator.register_processor(chain_registration()).await?;
    assert!(h.coordinator.start_health_monitor());
    // Only one monitor at a time.
    assert!(!h.coordinator.start_health_monitor());

    sleep(Duration::from_millis(150)).await;

    assert!(h.transport.heartbeats("P") >= 3);
    assert!(h.coordinator.registry().is_available("P"));

    h.coordinator.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn two_misses_then_recovery_keeps_processor() -> TestResult {
    init_tracing();
    let mut settings = fast_heartbeats();
    settings.heartbeat.interval = Duration::from_millis(40);
    settings.heartbeat.timeout = Duration::from_millis(20);
    let h = harness_with(settings);
    h.coordinator.register_processor(chain_registration()).await?;

    h.transport.set_alive("P", false);
    assert!(h.coordinator.start_health_monitor());

    // Wait for at least one miss, but well short of three intervals.
    timeout(WAIT, async {
        while h.transport.heartbeats("P") < 1 {
            sleep(Duration::from_millis(2)).await;
        }
    })
    .await?;
    h.transport.set_alive("P", true);

    sleep(Duration::from_millis(200)).await;
    assert!(h.coordinator.registry().is_available("P"));

    h.coordinator.shutdown().await;
    Ok(())
}
