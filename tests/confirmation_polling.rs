//! Receipt polling cadence, bounds and cancellation

mod common;

use alloy::primitives::TxHash;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use bridge_orchestrator::{BridgeError, ConfirmationConfig, ConfirmationPoller};
use common::{MockGateway, ETHEREUM};

fn hash() -> TxHash {
    TxHash::repeat_byte(0x42)
}

#[tokio::test(start_paused = true)]
async fn test_receipt_found_after_n_misses() {
    for misses in [0u32, 1, 4] {
        let gateway = MockGateway::new();
        gateway.state().pending_lookups = misses;
        let poller = ConfirmationPoller::default();

        let start = Instant::now();
        let receipt = poller
            .wait_for_receipt(gateway.as_ref(), ETHEREUM, hash(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt.tx_hash, hash());
        assert!(receipt.success);
        assert_eq!(gateway.receipt_calls(), misses + 1);
        assert_eq!(start.elapsed(), Duration::from_secs(misses as u64));
    }
}

#[tokio::test(start_paused = true)]
async fn test_reverted_receipt_is_error() {
    let gateway = MockGateway::new();
    gateway.state().revert = true;
    let poller = ConfirmationPoller::default();

    let receipt = poller
        .wait_for_receipt(gateway.as_ref(), ETHEREUM, hash(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!receipt.success);

    let err = poller
        .wait_for_success(gateway.as_ref(), ETHEREUM, hash(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Reverted { tx_hash } if tx_hash == hash()));
}

#[tokio::test(start_paused = true)]
async fn test_max_attempts_bounds_polling() {
    let gateway = MockGateway::new();
    gateway.state().pending_lookups = u32::MAX;
    let poller = ConfirmationPoller::new(ConfirmationConfig {
        poll_interval: Duration::from_secs(2),
        max_attempts: Some(3),
    });

    let err = poller
        .wait_for_receipt(gateway.as_ref(), ETHEREUM, hash(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::ConfirmationTimeout { attempts: 3, .. }
    ));
    assert_eq!(gateway.receipt_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_polling() {
    let gateway = MockGateway::new();
    gateway.state().pending_lookups = u32::MAX;
    let poller = ConfirmationPoller::default();
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5_500)).await;
            cancel.cancel();
        })
    };

    let err = poller
        .wait_for_receipt(gateway.as_ref(), ETHEREUM, hash(), &cancel)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, BridgeError::Cancelled));
    assert_eq!(gateway.receipt_calls(), 6);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(gateway.receipt_calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_spawned_watch_join_and_stop() {
    let gateway = MockGateway::new();
    gateway.state().pending_lookups = 2;
    let poller = ConfirmationPoller::default();

    let watch = poller.spawn(gateway.clone(), ETHEREUM, hash());
    let receipt = watch.join().await.unwrap();
    assert_eq!(receipt.block_number, Some(19_000_000));

    let stuck = MockGateway::new();
    stuck.state().pending_lookups = u32::MAX;
    let watch = poller.spawn(stuck.clone(), ETHEREUM, hash());
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!watch.is_finished());
    watch.stop().await;

    let calls = stuck.receipt_calls();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(stuck.receipt_calls(), calls);
}
