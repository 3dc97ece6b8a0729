//! Domain types for the cluster management API.
//!
//! These mirror the JSON documents served by the broker's `/cluster`
//! actuator. Field names are camelCase on the wire; unknown fields (exporter
//! config, timestamps we don't track) are ignored on deserialization.

use serde::{Deserialize, Serialize};

/// Broker identifier, unique within a topology.
pub type BrokerId = i32;

/// Partition identifier. Cluster-wide, not broker-local.
pub type PartitionId = i32;

/// Identifier of a topology change. Monotonically increasing over the
/// lifetime of a cluster.
pub type ChangeId = i64;

/// Status reported for a change that finished successfully.
pub const STATUS_COMPLETED: &str = "COMPLETED";

// ── Topology ───────────────────────────────────────────────────────

/// A snapshot of the cluster topology as reported by the control endpoint.
///
/// Produced fresh on every query and never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub brokers: Vec<BrokerState>,
    #[serde(default)]
    pub last_change: Option<LastChange>,
    #[serde(default)]
    pub pending_change: Option<PendingChange>,
    #[serde(default)]
    pub routing: Option<RoutingState>,
}

impl Topology {
    /// Sort brokers by identifier. The actuator returns them in arbitrary
    /// order.
    pub fn sort_brokers(&mut self) {
        self.brokers.sort_by_key(|b| b.id);
    }

    pub fn broker_count(&self) -> usize {
        self.brokers.len()
    }

    pub fn broker_ids(&self) -> Vec<BrokerId> {
        self.brokers.iter().map(|b| b.id).collect()
    }

    /// Effective partition count: the highest partition id hosted by any
    /// broker. Zero for an empty topology.
    pub fn partition_count(&self) -> PartitionId {
        self.brokers
            .iter()
            .flat_map(|b| b.partitions.iter())
            .map(|p| p.id)
            .max()
            .unwrap_or(0)
    }
}

/// State of a single broker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerState {
    pub id: BrokerId,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub partitions: Vec<PartitionState>,
}

/// A partition replica hosted on a broker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionState {
    pub id: PartitionId,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub priority: i32,
}

// ── Changes ────────────────────────────────────────────────────────

/// The most recently finished change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastChange {
    pub id: ChangeId,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl LastChange {
    /// Anything other than `COMPLETED` counts as failed.
    pub fn succeeded(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}

/// The change currently being applied by the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub id: ChangeId,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub internal_version: i64,
    #[serde(default)]
    pub completed: Vec<Operation>,
    #[serde(default)]
    pub pending: Vec<Operation>,
}

impl PendingChange {
    /// Returns `(completed, total)` operation counts.
    pub fn progress(&self) -> (usize, usize) {
        let done = self.completed.len();
        (done, done + self.pending.len())
    }
}

/// A single step of a topology change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation: String,
    pub broker_id: BrokerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// Response to a change request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResponse {
    pub change_id: ChangeId,
    #[serde(default)]
    pub current_topology: Vec<BrokerState>,
    #[serde(default)]
    pub planned_changes: Vec<Operation>,
    #[serde(default)]
    pub expected_topology: Vec<BrokerState>,
}

// ── Routing ────────────────────────────────────────────────────────

/// How the gateway routes requests and message correlation to partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingState {
    #[serde(default)]
    pub version: i64,
    pub message_correlation: MessageCorrelation,
    pub request_handling: RequestHandling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCorrelation {
    pub strategy: String,
    #[serde(default)]
    pub partition_count: u32,
}

/// Request handling strategy, discriminated by the `strategy` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy")]
pub enum RequestHandling {
    #[serde(rename_all = "camelCase")]
    AllPartitions { partition_count: u32 },
    #[serde(rename_all = "camelCase")]
    ActivePartitions {
        base_partition_count: u32,
        #[serde(default)]
        additional_active_partitions: Vec<PartitionId>,
        #[serde(default)]
        inactive_partitions: Vec<PartitionId>,
    },
    #[serde(other)]
    Other,
}
