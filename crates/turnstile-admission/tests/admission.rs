//! Integration tests for the admission controller and the promoter task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use turnstile_admission::{
    Admission, AdmissionConfig, AdmissionController, AdmissionError, QueueError, ReloginPolicy,
    run_promoter,
};
use turnstile_protocol::{PlayerId, PlayerProfile};

fn profile(account: &str) -> PlayerProfile {
    PlayerProfile {
        id: PlayerId::for_account(account),
        nickname: format!("Player_{account}"),
        level: 1,
        exp: 0,
        vip_level: 0,
        items: vec![1001, 1002],
    }
}

fn config(capacity: usize) -> AdmissionConfig {
    AdmissionConfig {
        capacity,
        relogin: ReloginPolicy::Reject,
        promote_interval: Duration::from_millis(500),
        average_service_time: Duration::from_secs(5),
        idle_timeout: None,
    }
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_admit_concurrent_logins_never_exceed_capacity() {
    let ctl = Arc::new(AdmissionController::new(config(10)));

    let mut handles = Vec::new();
    for i in 0..64 {
        let ctl = Arc::clone(&ctl);
        handles.push(tokio::spawn(async move {
            let account = format!("user{i}");
            ctl.admit(&account, "D", profile(&account)).await
        }));
    }

    let mut admitted = 0;
    let mut positions = HashSet::new();
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            Admission::Admitted(_) => admitted += 1,
            Admission::Queued { position, .. } => {
                assert!(positions.insert(position), "duplicate position {position}");
            }
        }
    }

    assert_eq!(admitted, 10);
    assert_eq!(ctl.occupancy().await, 10);
    assert_eq!(ctl.queue_len().await, 54);
    assert_eq!(positions, (1..=54).collect::<HashSet<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_admit_same_account_concurrently_yields_one_session() {
    let ctl = Arc::new(AdmissionController::new(config(10)));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let ctl = Arc::clone(&ctl);
        handles.push(tokio::spawn(async move {
            ctl.admit("dup", "D", profile("dup")).await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(Admission::Admitted(_)) => ok += 1,
            Ok(other) => panic!("unexpected {other:?}"),
            Err(AdmissionError::Session(_)) => {}
            Err(e) => panic!("unexpected error {e}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(ctl.occupancy().await, 1);
}

// =========================================================================
// Promoter
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_promoter_admits_queued_account_after_kick() {
    let ctl = Arc::new(AdmissionController::new(config(1)));
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_promoter(Arc::clone(&ctl), cancel.clone()));

    ctl.admit("a", "DA", profile("a")).await.unwrap();
    let Admission::Queued { ticket, position } = ctl.admit("c", "DC", profile("c")).await.unwrap()
    else {
        panic!("c should queue at capacity 1");
    };
    assert_eq!(position, 1);

    ctl.kick(&PlayerId::for_account("a")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    let session = ctl.find_by_token(&ticket).await.expect("promoted");
    assert_eq!(session.account, "c");
    assert_eq!(session.device_id, "DC");
    assert!(matches!(
        ctl.queue_status(&ticket).await,
        Err(AdmissionError::Queue(QueueError::NotInQueue(_)))
    ));

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_promoter_waits_for_interval_before_promoting() {
    let ctl = Arc::new(AdmissionController::new(config(1)));
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_promoter(Arc::clone(&ctl), cancel.clone()));

    ctl.admit("a", "D", profile("a")).await.unwrap();
    ctl.admit("b", "D", profile("b")).await.unwrap();
    ctl.kick(&PlayerId::for_account("a")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ctl.is_queued("b").await);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!ctl.is_queued("b").await);
    assert!(ctl.find_by_account("b").await.is_some());

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_promoter_exits_on_cancel() {
    let ctl = Arc::new(AdmissionController::new(config(1)));
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_promoter(ctl, cancel.clone()));

    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("promoter should stop")
        .unwrap();
}

#[tokio::test]
async fn test_promotion_tick_evicts_idle_then_promotes() {
    let ctl = AdmissionController::new(AdmissionConfig {
        idle_timeout: Some(Duration::from_millis(20)),
        ..config(1)
    });
    ctl.admit("a", "D", profile("a")).await.unwrap();
    ctl.admit("b", "D", profile("b")).await.unwrap();

    // Idle eviction compares against the wall clock.
    std::thread::sleep(Duration::from_millis(40));
    let report = ctl.promotion_tick().await;

    assert_eq!(report.evicted.len(), 1);
    assert_eq!(report.evicted[0].account, "a");
    assert_eq!(report.promoted.len(), 1);
    assert_eq!(report.promoted[0].account, "b");
}

// =========================================================================
// End-to-end scenario
// =========================================================================

#[tokio::test]
async fn test_scenario_full_server_kick_then_promotion() {
    let ctl = AdmissionController::new(config(2));
    ctl.admit("a", "D", profile("a")).await.unwrap();
    ctl.admit("b", "D", profile("b")).await.unwrap();
    let Admission::Queued { ticket, .. } = ctl.admit("c", "DC", profile("c")).await.unwrap() else {
        panic!("c should queue");
    };

    let status = ctl.queue_status(&ticket).await.unwrap();
    assert_eq!((status.position, status.total), (1, 1));
    assert_eq!(status.estimated_wait, Duration::from_secs(5));

    ctl.kick(&PlayerId::for_account("b")).await.unwrap();
    let promoted = ctl.promote().await;

    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].token, ticket);
    assert!(ctl.find_by_account("b").await.is_none());
    assert!(matches!(
        ctl.queue_status(&ticket).await,
        Err(AdmissionError::Queue(QueueError::NotInQueue(_)))
    ));
    assert_eq!(ctl.occupancy().await, 2);
}
