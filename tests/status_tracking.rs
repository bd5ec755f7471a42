//! Indexer status polling

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use bridge_orchestrator::{StatusTracker, TrackerConfig, TransactionStatus};
use common::{tx_record, wait_until_idle, MockIndexer};

use TransactionStatus::{Executed, Failed, Pending};

fn tracker(indexer: &Arc<MockIndexer>) -> StatusTracker<MockIndexer> {
    StatusTracker::new(Arc::clone(indexer), TrackerConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_polls_until_executed_then_stops() {
    let indexer = MockIndexer::new();
    indexer.script(&[Pending, Pending, Executed]);
    let mut tracker = tracker(&indexer);
    let mut rx = tracker.subscribe();

    let start = Instant::now();
    tracker.track(tx_record("msg-1", Pending)).await;
    assert!(tracker.is_polling());
    assert_eq!(tracker.tracked_message_id(), Some("msg-1"));

    let state = wait_until_idle(&mut rx).await;
    assert_eq!(indexer.fetches(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(21));
    assert_eq!(tracker.tracked_message_id(), None);
    let tx = state.transaction.unwrap();
    assert_eq!(tx.status, Executed);
    assert!(tx.target_tx_hash.is_some());
    assert!(state.error.is_none());

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(indexer.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_initial_record_is_not_polled() {
    let indexer = MockIndexer::new();
    let mut tracker = tracker(&indexer);

    tracker.track(tx_record("msg-1", Executed)).await;
    assert!(!tracker.is_polling());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(indexer.fetches(), 0);
    assert_eq!(
        tracker.snapshot().transaction.unwrap().status,
        Executed
    );
}

#[tokio::test(start_paused = true)]
async fn test_poll_error_keeps_last_snapshot() {
    let indexer = MockIndexer::new();
    indexer
        .state()
        .script
        .extend([Err("503 Service Unavailable".to_string()), Ok(Executed)]);
    let mut tracker = tracker(&indexer);
    let mut rx = tracker.subscribe();

    tracker.track(tx_record("msg-1", Pending)).await;

    let errored = rx.wait_for(|s| s.error.is_some()).await.unwrap().clone();
    assert!(errored.polling);
    assert!(errored.error.unwrap().contains("503"));
    assert_eq!(errored.transaction.unwrap().status, Pending);

    let state = wait_until_idle(&mut rx).await;
    assert!(state.error.is_none());
    assert_eq!(state.transaction.unwrap().status, Executed);
    assert_eq!(indexer.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_keeps_polling_by_default() {
    let indexer = MockIndexer::new();
    indexer.script(&[Failed]);
    let mut tracker = tracker(&indexer);

    tracker.track(tx_record("msg-1", Pending)).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(tracker.is_polling());
    assert!(indexer.fetches() > 1);
    assert_eq!(tracker.snapshot().transaction.unwrap().status, Failed);
    tracker.clear().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_stops_when_configured() {
    let indexer = MockIndexer::new();
    indexer.script(&[Failed]);
    let mut tracker = StatusTracker::new(
        Arc::clone(&indexer),
        TrackerConfig {
            stop_on_failed: true,
            ..TrackerConfig::default()
        },
    );
    let mut rx = tracker.subscribe();

    tracker.track(tx_record("msg-1", Pending)).await;
    assert_eq!(tracker.tracked_message_id(), Some("msg-1"));
    let state = wait_until_idle(&mut rx).await;

    assert_eq!(state.transaction.unwrap().status, Failed);
    assert_eq!(tracker.tracked_message_id(), None);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(indexer.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retarget_stops_previous_poll() {
    let indexer = MockIndexer::new();
    let mut tracker = tracker(&indexer);

    tracker.track(tx_record("msg-old", Pending)).await;
    tokio::time::sleep(Duration::from_secs(8)).await;
    assert_eq!(indexer.state().fetched, vec!["msg-old".to_string()]);

    tracker.track(tx_record("msg-new", Pending)).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    let fetched = indexer.state().fetched.clone();
    assert_eq!(fetched[0], "msg-old");
    assert!(fetched[1..].iter().all(|id| id == "msg-new"));
    assert_eq!(
        tracker.snapshot().transaction.unwrap().message_id,
        "msg-new"
    );
    tracker.clear().await;
}

#[tokio::test(start_paused = true)]
async fn test_clear_resets_state_and_stops() {
    let indexer = MockIndexer::new();
    let mut tracker = tracker(&indexer);

    tracker.track(tx_record("msg-1", Pending)).await;
    tracker.clear().await;

    let state = tracker.snapshot();
    assert!(state.transaction.is_none());
    assert!(!state.polling);
    assert!(tracker.tracked_message_id().is_none());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(indexer.fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_keeps_snapshot() {
    let indexer = MockIndexer::new();
    let mut tracker = tracker(&indexer);

    tracker.track(tx_record("msg-1", Pending)).await;
    tracker.stop().await;

    let state = tracker.snapshot();
    assert!(!state.polling);
    assert_eq!(tracker.tracked_message_id(), None);
    assert_eq!(state.transaction.unwrap().message_id, "msg-1");
}

#[tokio::test(start_paused = true)]
async fn test_resume_fetches_immediately() {
    let indexer = MockIndexer::new();
    indexer.script(&[Executed]);
    let mut tracker = tracker(&indexer);
    let mut rx = tracker.subscribe();

    let start = Instant::now();
    tracker.resume("msg-7").await;
    let state = wait_until_idle(&mut rx).await;

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(state.transaction.unwrap().message_id, "msg-7");
    assert_eq!(indexer.fetches(), 1);
}
