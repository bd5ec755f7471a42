//! Status Tracker
//!
//! Follows a registered transfer on the indexer by message id. While the
//! record is `pending` the tracker re-fetches it on a fixed cadence; every
//! response replaces the cached snapshot wholesale (last write wins).
//!
//! Polling stops on `executed`, on `failed` when configured to, or when the
//! caller clears or replaces the tracked transfer. At most one polling task
//! exists per tracker: starting a new target stops and joins the previous
//! task before anything new is published, so a stale poll can never
//! overwrite a newer snapshot.
//!
//! Poll failures are recorded as a soft error next to the last good
//! snapshot; the next tick retries regardless.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::indexer::IndexerApi;
use crate::types::{BridgeTransaction, TransactionStatus};

/// Default indexer poll cadence
pub const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(7);

/// Status tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    /// Treat `failed` as a stop condition; off by default
    pub stop_on_failed: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            stop_on_failed: false,
        }
    }
}

impl TrackerConfig {
    /// Whether polling should end once `status` is observed
    pub fn should_stop(&self, status: TransactionStatus) -> bool {
        match status {
            TransactionStatus::Executed => true,
            TransactionStatus::Failed => self.stop_on_failed,
            TransactionStatus::Pending => false,
        }
    }
}

/// Observable tracker state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerState {
    /// Latest snapshot from the indexer
    pub transaction: Option<BridgeTransaction>,
    /// Whether a polling task is active
    pub polling: bool,
    /// Last poll error; cleared by the next successful poll
    pub error: Option<String>,
}

struct PollTask {
    message_id: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollTask {
    async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
        debug!(message_id = %self.message_id, "Status polling stopped");
    }
}

/// Polls the indexer for one tracked transfer at a time
pub struct StatusTracker<I: ?Sized> {
    indexer: Arc<I>,
    config: TrackerConfig,
    state: Arc<watch::Sender<TrackerState>>,
    active: Option<PollTask>,
}

impl<I: IndexerApi + ?Sized + 'static> StatusTracker<I> {
    pub fn new(indexer: Arc<I>, config: TrackerConfig) -> Self {
        let (state, _) = watch::channel(TrackerState::default());
        Self {
            indexer,
            config,
            state: Arc::new(state),
            active: None,
        }
    }

    /// Observe snapshot, polling flag and poll errors
    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state.subscribe()
    }

    /// Current state
    pub fn snapshot(&self) -> TrackerState {
        self.state.borrow().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.state.borrow().polling
    }

    /// Message id currently being polled
    ///
    /// `None` once polling has ended, whether it stopped on a final status
    /// or was stopped by the caller.
    pub fn tracked_message_id(&self) -> Option<&str> {
        if !self.is_polling() {
            return None;
        }
        self.active.as_ref().map(|t| t.message_id.as_str())
    }

    /// Track a freshly registered transfer
    ///
    /// Publishes `initial` immediately and polls from the next tick unless it
    /// is already in a stop state.
    pub async fn track(&mut self, initial: BridgeTransaction) {
        self.stop_active().await;

        let done = self.config.should_stop(initial.status);
        let message_id = initial.message_id.clone();
        info!(
            message_id = %message_id,
            status = %initial.status,
            "Tracking bridge transaction"
        );

        self.state.send_replace(TrackerState {
            transaction: Some(initial),
            polling: !done,
            error: None,
        });

        if !done {
            self.spawn_poll(message_id, false);
        }
    }

    /// Resume tracking a transfer known only by message id
    ///
    /// The first fetch happens immediately.
    pub async fn resume(&mut self, message_id: &str) {
        self.stop_active().await;
        info!(message_id = %message_id, "Resuming bridge transaction tracking");

        self.state.send_replace(TrackerState {
            transaction: None,
            polling: true,
            error: None,
        });
        self.spawn_poll(message_id.to_string(), true);
    }

    /// Stop polling and forget the tracked transfer
    pub async fn clear(&mut self) {
        self.stop_active().await;
        self.state.send_replace(TrackerState::default());
    }

    /// Stop polling but keep the last snapshot
    pub async fn stop(&mut self) {
        self.stop_active().await;
        self.state.send_modify(|s| s.polling = false);
    }

    async fn stop_active(&mut self) {
        if let Some(task) = self.active.take() {
            task.stop().await;
        }
    }

    fn spawn_poll(&mut self, message_id: String, immediate: bool) {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.indexer),
            message_id.clone(),
            self.config.clone(),
            Arc::clone(&self.state),
            cancel.clone(),
            immediate,
        ));
        self.active = Some(PollTask {
            message_id,
            cancel,
            handle,
        });
    }
}

impl<I: ?Sized> Drop for StatusTracker<I> {
    fn drop(&mut self) {
        if let Some(task) = self.active.take() {
            task.cancel.cancel();
        }
    }
}

async fn poll_loop<I: IndexerApi + ?Sized>(
    indexer: Arc<I>,
    message_id: String,
    config: TrackerConfig,
    state: Arc<watch::Sender<TrackerState>>,
    cancel: CancellationToken,
    immediate: bool,
) {
    let mut wait = !immediate;

    loop {
        if wait {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(config.poll_interval) => {}
            }
        }
        wait = true;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = indexer.transaction(&message_id) => result,
        };

        match result {
            Ok(tx) => {
                let status = tx.status;
                let done = config.should_stop(status);
                debug!(message_id = %message_id, status = %status, "Indexer status polled");

                state.send_modify(|s| {
                    s.transaction = Some(tx);
                    s.error = None;
                    s.polling = !done;
                });

                if done {
                    info!(
                        message_id = %message_id,
                        status = %status,
                        "Bridge transaction reached final status"
                    );
                    return;
                }
            }
            Err(e) => {
                warn!(message_id = %message_id, error = %e, "Indexer status poll failed");
                state.send_modify(|s| s.error = Some(e.to_string()));
            }
        }
    }
}
