//! Progress Projector
//!
//! Maps a transfer's status and age onto one of five ordered display steps.
//! For pending transfers the step is a time-based estimate of perceived
//! progress: it saturates at [`ProgressStep::Sending`] and only indexer data
//! moves it to [`ProgressStep::Finished`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::types::{BridgeTransaction, TransactionStatus};

/// Heuristic duration over which a pending transfer walks through the steps
pub const DEFAULT_PROGRESS_WINDOW: Duration = Duration::from_secs(20 * 60);

/// Discrete progress step, ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ProgressStep {
    Waiting = 0,
    Confirming = 1,
    Exchanging = 2,
    Sending = 3,
    Finished = 4,
}

impl ProgressStep {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgressStep::Waiting => "Waiting",
            ProgressStep::Confirming => "Confirming",
            ProgressStep::Exchanging => "Exchanging",
            ProgressStep::Sending => "Sending",
            ProgressStep::Finished => "Finished",
        }
    }

    fn from_fraction(progress: f64) -> Self {
        if progress < 0.35 {
            ProgressStep::Waiting
        } else if progress < 0.65 {
            ProgressStep::Confirming
        } else if progress < 0.90 {
            ProgressStep::Exchanging
        } else {
            ProgressStep::Sending
        }
    }
}

impl fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fraction of `window` elapsed since `created_at`, clamped to `[0, 1]`
///
/// A `created_at` in the future (clock skew) counts as zero elapsed.
pub fn elapsed_fraction(created_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> f64 {
    if window.is_zero() {
        return 1.0;
    }
    let elapsed = (now - created_at).to_std().unwrap_or(Duration::ZERO);
    (elapsed.as_secs_f64() / window.as_secs_f64()).min(1.0)
}

/// Project a step from status and age
///
/// `executed` and `failed` are terminal and map to `Finished`; the UI
/// distinguishes the outcome from the status itself.
pub fn project(
    status: TransactionStatus,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> ProgressStep {
    match status {
        TransactionStatus::Executed | TransactionStatus::Failed => ProgressStep::Finished,
        TransactionStatus::Pending => {
            ProgressStep::from_fraction(elapsed_fraction(created_at, now, window))
        }
    }
}

/// Project a step for an indexer record
pub fn project_transaction(
    tx: &BridgeTransaction,
    now: DateTime<Utc>,
    window: Duration,
) -> ProgressStep {
    project(tx.status, tx.created_at, now, window)
}
