//! Change request construction for both generations of the cluster API.
//!
//! ```text
//! Unified  PATCH /cluster?force=false          {"brokers":{"count":3},"partitions":{"count":6}}
//! Legacy   POST  /cluster/brokers?force=false&replicationFactor=3   [0,1,2]
//! ```
//!
//! Unset fields are omitted from the body entirely. The receiving side
//! treats a present `0` as "scale to zero", which is never what an unset
//! target means.

use std::collections::BTreeSet;

use serde::Serialize;
use zbchaos_core::BrokerId;

use crate::error::{ClientError, ClientResult};

pub const CLUSTER_PATH: &str = "/cluster";
pub const LEGACY_BROKERS_PATH: &str = "/cluster/brokers";

/// Which generation of the change API to talk to.
///
/// Clusters that predate the unified endpoint answer its PATCH with
/// `405 Method Not Allowed`; that answer is the only capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeProtocol {
    Unified,
    Legacy,
}

/// Body of a unified `PATCH /cluster` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterPatchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brokers: Option<BrokerDelta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<PartitionDelta>,
}

/// Broker part of a change. Exactly one mode per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BrokerDelta {
    /// Target broker count; the cluster adds or removes the highest ids.
    Count(u32),
    Add(Vec<BrokerId>),
    Remove(Vec<BrokerId>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication_factor: Option<u32>,
}

impl ClusterPatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale to `count` brokers. Replaces any earlier broker mode.
    pub fn with_broker_count(mut self, count: u32) -> Self {
        self.brokers = Some(BrokerDelta::Count(count));
        self
    }

    /// Add the given brokers. An empty list leaves the request unchanged.
    pub fn with_brokers_added(mut self, ids: Vec<BrokerId>) -> Self {
        if !ids.is_empty() {
            self.brokers = Some(BrokerDelta::Add(ids));
        }
        self
    }

    /// Remove the given brokers. An empty list leaves the request unchanged.
    pub fn with_brokers_removed(mut self, ids: Vec<BrokerId>) -> Self {
        if !ids.is_empty() {
            self.brokers = Some(BrokerDelta::Remove(ids));
        }
        self
    }

    /// Set partition count and/or replication factor. With both unset the
    /// partition section is dropped.
    pub fn with_partitions(mut self, count: Option<u32>, replication_factor: Option<u32>) -> Self {
        self.partitions = if count.is_none() && replication_factor.is_none() {
            None
        } else {
            Some(PartitionDelta {
                count,
                replication_factor,
            })
        };
        self
    }

    pub fn is_empty(&self) -> bool {
        self.brokers.is_none() && self.partitions.is_none()
    }

    /// Whether translating to the legacy shape needs the current broker set.
    pub fn needs_current_brokers(&self) -> bool {
        !matches!(self.brokers, Some(BrokerDelta::Count(_)))
    }

    pub fn to_json(&self) -> ClientResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Body and parameters of a legacy `POST /cluster/brokers` request: the
/// complete list of brokers the cluster should end up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyBrokerRequest {
    pub broker_ids: Vec<BrokerId>,
    pub replication_factor: Option<u32>,
}

impl LegacyBrokerRequest {
    /// Translate a unified request into the equivalent target broker list.
    ///
    /// `current` is consulted for add/remove requests and for requests that
    /// only change the replication factor, which resubmit the current set.
    pub fn from_patch(patch: &ClusterPatchRequest, current: &[BrokerId]) -> ClientResult<Self> {
        if patch.is_empty() {
            return Err(ClientError::LegacyUnsupported("empty change".to_string()));
        }
        let partitions = patch.partitions.clone().unwrap_or_default();
        if partitions.count.is_some() {
            return Err(ClientError::LegacyUnsupported(
                "partition count changes".to_string(),
            ));
        }

        let broker_ids = match &patch.brokers {
            None => current.to_vec(),
            Some(BrokerDelta::Count(count)) => (0..*count as BrokerId).collect(),
            Some(BrokerDelta::Add(ids)) => {
                let set: BTreeSet<BrokerId> = current.iter().chain(ids.iter()).copied().collect();
                set.into_iter().collect()
            }
            Some(BrokerDelta::Remove(ids)) => current
                .iter()
                .copied()
                .filter(|id| !ids.contains(id))
                .collect(),
        };

        Ok(Self {
            broker_ids,
            replication_factor: partitions.replication_factor,
        })
    }

    pub fn path_and_query(&self, force: bool) -> String {
        let mut path = format!("{LEGACY_BROKERS_PATH}?force={force}");
        if let Some(rf) = self.replication_factor {
            path.push_str(&format!("&replicationFactor={rf}"));
        }
        path
    }

    pub fn to_json(&self) -> ClientResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.broker_ids)?)
    }
}

pub fn unified_path_and_query(force: bool) -> String {
    format!("{CLUSTER_PATH}?force={force}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(req: &ClusterPatchRequest) -> String {
        String::from_utf8(req.to_json().unwrap()).unwrap()
    }

    #[test]
    fn brokers_and_partitions() {
        let req = ClusterPatchRequest::new()
            .with_broker_count(3)
            .with_partitions(Some(6), Some(3));
        assert_eq!(
            json(&req),
            r#"{"brokers":{"count":3},"partitions":{"count":6,"replicationFactor":3}}"#
        );
    }

    #[test]
    fn brokers_only_omits_partitions() {
        let req = ClusterPatchRequest::new()
            .with_broker_count(3)
            .with_partitions(None, None);
        assert_eq!(json(&req), r#"{"brokers":{"count":3}}"#);
    }

    #[test]
    fn partitions_only_omits_brokers() {
        let req = ClusterPatchRequest::new().with_partitions(Some(8), Some(3));
        assert_eq!(
            json(&req),
            r#"{"partitions":{"count":8,"replicationFactor":3}}"#
        );
    }

    #[test]
    fn replication_factor_only_omits_count() {
        let req = ClusterPatchRequest::new().with_partitions(None, Some(3));
        assert_eq!(json(&req), r#"{"partitions":{"replicationFactor":3}}"#);
    }

    #[test]
    fn remove_list() {
        let req = ClusterPatchRequest::new().with_brokers_removed(vec![1, 3]);
        assert_eq!(json(&req), r#"{"brokers":{"remove":[1,3]}}"#);
        assert!(req.needs_current_brokers());
    }

    #[test]
    fn later_broker_mode_replaces_earlier() {
        let req = ClusterPatchRequest::new()
            .with_brokers_added(vec![4])
            .with_broker_count(2);
        assert_eq!(req.brokers, Some(BrokerDelta::Count(2)));
        assert!(!req.needs_current_brokers());
    }

    #[test]
    fn empty_lists_are_ignored() {
        let req = ClusterPatchRequest::new()
            .with_brokers_added(vec![])
            .with_brokers_removed(vec![]);
        assert!(req.is_empty());
        assert_eq!(json(&req), "{}");
    }

    #[test]
    fn legacy_count_becomes_id_range() {
        let patch = ClusterPatchRequest::new()
            .with_broker_count(4)
            .with_partitions(None, Some(2));
        let legacy = LegacyBrokerRequest::from_patch(&patch, &[]).unwrap();

        assert_eq!(legacy.broker_ids, vec![0, 1, 2, 3]);
        assert_eq!(legacy.path_and_query(false), "/cluster/brokers?force=false&replicationFactor=2");
        assert_eq!(legacy.to_json().unwrap(), b"[0,1,2,3]");
    }

    #[test]
    fn legacy_remove_keeps_remaining_brokers() {
        let patch = ClusterPatchRequest::new().with_brokers_removed(vec![1, 3]);
        let legacy = LegacyBrokerRequest::from_patch(&patch, &[0, 1, 2, 3]).unwrap();

        assert_eq!(legacy.broker_ids, vec![0, 2]);
        assert_eq!(legacy.path_and_query(true), "/cluster/brokers?force=true");
    }

    #[test]
    fn legacy_add_merges_with_current() {
        let patch = ClusterPatchRequest::new().with_brokers_added(vec![3, 1]);
        let legacy = LegacyBrokerRequest::from_patch(&patch, &[0, 1, 2]).unwrap();
        assert_eq!(legacy.broker_ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn legacy_rejects_partition_count() {
        let patch = ClusterPatchRequest::new().with_partitions(Some(8), None);
        assert!(matches!(
            LegacyBrokerRequest::from_patch(&patch, &[]),
            Err(ClientError::LegacyUnsupported(_))
        ));

        assert!(matches!(
            LegacyBrokerRequest::from_patch(&ClusterPatchRequest::new(), &[0]),
            Err(ClientError::LegacyUnsupported(_))
        ));
    }

    #[test]
    fn legacy_replication_factor_resubmits_current_brokers() {
        let patch = ClusterPatchRequest::new().with_partitions(None, Some(3));
        assert!(patch.needs_current_brokers());

        let legacy = LegacyBrokerRequest::from_patch(&patch, &[0, 1, 2]).unwrap();
        assert_eq!(legacy.broker_ids, vec![0, 1, 2]);
        assert_eq!(
            legacy.path_and_query(false),
            "/cluster/brokers?force=false&replicationFactor=3"
        );
    }

    #[test]
    fn unified_query_carries_force_flag() {
        assert_eq!(unified_path_and_query(true), "/cluster?force=true");
        assert_eq!(unified_path_and_query(false), "/cluster?force=false");
    }
}
