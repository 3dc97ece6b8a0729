//! Scaling error types.

use std::time::Duration;

use thiserror::Error;
use zbchaos_client::ClientError;
use zbchaos_core::{ChangeId, RegionError};

/// Errors that can occur while planning, submitting or watching a change.
#[derive(Debug, Error)]
pub enum ScaleError {
    /// A change is already in flight; nothing was submitted.
    #[error("cluster is already scaling (change {change_id} is pending)")]
    AlreadyScaling { change_id: ChangeId },

    #[error("change {change_id} failed with status {status}")]
    ChangeFailed { change_id: ChangeId, status: String },

    /// The wait was abandoned. The change may still be running remotely.
    #[error("change {} did not complete within {timeout:?}", describe_change(.change_id))]
    Timeout {
        change_id: Option<ChangeId>,
        timeout: Duration,
    },

    #[error("topology did not report {expected} brokers within {timeout:?} (last seen: {})", describe_count(.observed))]
    BrokersNotReady {
        expected: u32,
        observed: Option<usize>,
        timeout: Duration,
    },

    #[error("wait for change cancelled")]
    Cancelled,

    #[error("invalid region layout: {0}")]
    Region(#[from] RegionError),

    #[error("platform operation failed: {0:#}")]
    Platform(anyhow::Error),

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type ScaleResult<T> = Result<T, ScaleError>;

fn describe_change(change_id: &Option<ChangeId>) -> String {
    change_id.map_or_else(|| "<not yet known>".to_string(), |id| id.to_string())
}

fn describe_count(observed: &Option<usize>) -> String {
    observed.map_or_else(|| "no topology".to_string(), |n| format!("{n} brokers"))
}
