//! Classification of a tracked change against a topology snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ChangeId, Topology};

/// Status of a tracked change, derived from a single snapshot.
///
/// Never persisted: recompute it from every fresh topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    /// The change is the last change and it succeeded.
    Completed,
    /// The change is the last change and it did not succeed.
    Failed,
    /// The change is currently being applied.
    Pending,
    /// A newer change has already finished, so this one is assumed to
    /// have completed before it.
    Outdated,
    /// The change is not visible in the snapshot yet.
    Unknown,
}

impl ChangeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ChangeStatus::Completed | ChangeStatus::Failed | ChangeStatus::Outdated
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ChangeStatus::Completed => "COMPLETED",
            ChangeStatus::Failed => "FAILED",
            ChangeStatus::Pending => "PENDING",
            ChangeStatus::Outdated => "OUTDATED",
            ChangeStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify the change `tracked` against `topology`.
///
/// The last change wins over the pending change: a last change newer than
/// `tracked` makes it [`ChangeStatus::Outdated`] regardless of what is
/// pending.
pub fn classify(topology: &Topology, tracked: ChangeId) -> ChangeStatus {
    if let Some(last) = &topology.last_change {
        if last.id == tracked {
            return if last.succeeded() {
                ChangeStatus::Completed
            } else {
                ChangeStatus::Failed
            };
        }
        if last.id > tracked {
            return ChangeStatus::Outdated;
        }
    }

    match &topology.pending_change {
        Some(pending) if pending.id == tracked => ChangeStatus::Pending,
        _ => ChangeStatus::Unknown,
    }
}
