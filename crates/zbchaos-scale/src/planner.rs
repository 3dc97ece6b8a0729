//! Scaling planner. Decides which single change to request and orders it
//! against capacity changes on the platform.
//!
//! # Decision order
//!
//! ```text
//! pending change present            → AlreadyScaling (nothing submitted)
//! brokers < current                 → scale down: submit, wait (long), release capacity
//! brokers > current                 → scale up:   submit, add capacity, wait
//! partitions > current              → partition/replication change, wait
//! replication factor only           → partition/replication change, wait
//! partitions <= current             → no-op (partitions cannot shrink)
//! otherwise                         → no-op
//! ```
//!
//! Broker changes win over partition changes; one call requests at most
//! one class of change. Shrinking removes brokers logically before the
//! capacity goes away so data can migrate off them; growing submits first
//! and provisions right after, since the cluster waits for new brokers to
//! show up on its own.

use tokio::sync::watch;
use tracing::info;
use zbchaos_client::{ClusterApi, ClusterPatchRequest};
use zbchaos_core::{ChangeId, ChaosConfig, Topology};

use crate::error::{ScaleError, ScaleResult};
use crate::platform::Platform;
use crate::watcher::{ChangeWatcher, WatchOutcome, WatchSettings};

/// Desired cluster shape. `None` leaves a dimension untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScaleTarget {
    pub brokers: Option<u32>,
    pub partitions: Option<u32>,
    pub replication_factor: Option<u32>,
}

/// The single action chosen for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePlan {
    ScaleDownBrokers { from: u32, to: u32 },
    ScaleUpBrokers { from: u32, to: u32 },
    ChangePartitions {
        partitions: Option<u32>,
        replication_factor: Option<u32>,
    },
    NoChange(NoChangeReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoChangeReason {
    /// Partition count can only grow.
    PartitionShrinkUnsupported { current: u32, requested: u32 },
    AlreadyAtTarget,
}

impl ScalePlan {
    /// The change request for this plan, if it needs one.
    pub fn request(&self) -> Option<ClusterPatchRequest> {
        match *self {
            ScalePlan::ScaleDownBrokers { to, .. } | ScalePlan::ScaleUpBrokers { to, .. } => {
                Some(ClusterPatchRequest::new().with_broker_count(to))
            }
            ScalePlan::ChangePartitions {
                partitions,
                replication_factor,
            } => Some(ClusterPatchRequest::new().with_partitions(partitions, replication_factor)),
            ScalePlan::NoChange(_) => None,
        }
    }
}

/// Pick the action for `target` given the current `topology`.
pub fn plan(topology: &Topology, target: &ScaleTarget) -> ScaleResult<ScalePlan> {
    if let Some(pending) = &topology.pending_change {
        return Err(ScaleError::AlreadyScaling {
            change_id: pending.id,
        });
    }

    let current_brokers = topology.broker_count() as u32;
    if let Some(brokers) = target.brokers {
        if brokers < current_brokers {
            return Ok(ScalePlan::ScaleDownBrokers {
                from: current_brokers,
                to: brokers,
            });
        }
        if brokers > current_brokers {
            return Ok(ScalePlan::ScaleUpBrokers {
                from: current_brokers,
                to: brokers,
            });
        }
    }

    let current_partitions = topology.partition_count().max(0) as u32;
    match (target.partitions, target.replication_factor) {
        (Some(partitions), rf) if partitions > current_partitions => Ok(ScalePlan::ChangePartitions {
            partitions: Some(partitions),
            replication_factor: rf,
        }),
        (partitions, Some(rf)) if partitions.is_none_or(|p| p == current_partitions) => {
            Ok(ScalePlan::ChangePartitions {
                partitions: None,
                replication_factor: Some(rf),
            })
        }
        (Some(partitions), _) => Ok(ScalePlan::NoChange(
            NoChangeReason::PartitionShrinkUnsupported {
                current: current_partitions,
                requested: partitions,
            },
        )),
        (None, _) => Ok(ScalePlan::NoChange(NoChangeReason::AlreadyAtTarget)),
    }
}

/// Result of one [`ScalingPlanner::scale`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleReport {
    pub plan: ScalePlan,
    /// Id assigned by the cluster, if a request was submitted.
    pub change_id: Option<ChangeId>,
    pub outcome: Option<WatchOutcome>,
}

/// Drives a scaling decision end to end: fresh topology, plan, submit,
/// capacity change, wait.
pub struct ScalingPlanner<'a, C, P> {
    api: &'a C,
    platform: &'a P,
    config: &'a ChaosConfig,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<'a, C: ClusterApi, P: Platform> ScalingPlanner<'a, C, P> {
    pub fn new(api: &'a C, platform: &'a P, config: &'a ChaosConfig) -> Self {
        Self {
            api,
            platform,
            config,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub async fn scale(&self, target: &ScaleTarget) -> ScaleResult<ScaleReport> {
        let topology = self.api.query_topology().await?;
        let plan = plan(&topology, target)?;

        let Some(request) = plan.request() else {
            match plan {
                ScalePlan::NoChange(NoChangeReason::PartitionShrinkUnsupported {
                    current,
                    requested,
                }) => info!(
                    current,
                    requested, "cannot scale partitions down or to the same count, nothing to do"
                ),
                _ => info!(
                    brokers = topology.broker_count(),
                    partitions = topology.partition_count(),
                    "cluster is already at the requested size"
                ),
            }
            return Ok(ScaleReport {
                plan,
                change_id: None,
                outcome: None,
            });
        };

        info!(?plan, "scaling cluster");
        self.platform
            .pause_reconciliation()
            .await
            .map_err(ScaleError::Platform)?;

        let response = self.api.submit_change(&request, false).await?;
        let change_id = response.change_id;

        let outcome = match plan {
            ScalePlan::ScaleUpBrokers { to, .. } => {
                self.provision(to).await?;
                self.watch(change_id, WatchSettings::from_config(self.config)).await?
            }
            ScalePlan::ScaleDownBrokers { to, .. } => {
                // Brokers must leave the topology before their capacity goes.
                let outcome = self
                    .watch(change_id, WatchSettings::scale_down(self.config))
                    .await?;
                self.provision(to).await?;
                outcome
            }
            ScalePlan::ChangePartitions { .. } | ScalePlan::NoChange(_) => {
                self.watch(change_id, WatchSettings::from_config(self.config)).await?
            }
        };

        if self.config.scale.resume_reconciliation {
            self.platform
                .resume_reconciliation()
                .await
                .map_err(ScaleError::Platform)?;
        }

        Ok(ScaleReport {
            plan,
            change_id: Some(change_id),
            outcome: Some(outcome),
        })
    }

    async fn provision(&self, brokers: u32) -> ScaleResult<()> {
        info!(brokers, "scaling broker capacity");
        self.platform
            .scale_brokers(brokers)
            .await
            .map_err(ScaleError::Platform)
    }

    async fn watch(&self, change_id: ChangeId, settings: WatchSettings) -> ScaleResult<WatchOutcome> {
        let mut watcher = ChangeWatcher::new(self.api, settings);
        if let Some(rx) = &self.shutdown {
            watcher = watcher.with_shutdown(rx.clone());
        }
        watcher.wait(Some(change_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zbchaos_core::{BrokerState, PartitionState, PendingChange};

    /// `brokers` brokers each hosting partitions `1..=partitions`.
    fn topology(brokers: i32, partitions: i32) -> Topology {
        Topology {
            brokers: (0..brokers)
                .map(|id| BrokerState {
                    id,
                    state: "ACTIVE".to_string(),
                    version: 1,
                    partitions: (1..=partitions)
                        .map(|p| PartitionState {
                            id: p,
                            state: "ACTIVE".to_string(),
                            priority: 1,
                        })
                        .collect(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn target(brokers: Option<u32>, partitions: Option<u32>, rf: Option<u32>) -> ScaleTarget {
        ScaleTarget {
            brokers,
            partitions,
            replication_factor: rf,
        }
    }

    #[test]
    fn pending_change_blocks_everything() {
        let mut current = topology(3, 3);
        current.pending_change = Some(PendingChange {
            id: 8,
            status: "IN_PROGRESS".to_string(),
            internal_version: 0,
            completed: vec![],
            pending: vec![],
        });

        for t in [target(Some(5), None, None), target(None, None, None)] {
            assert!(matches!(
                plan(&current, &t),
                Err(ScaleError::AlreadyScaling { change_id: 8 })
            ));
        }
    }

    #[test]
    fn fewer_brokers_scales_down() {
        assert_eq!(
            plan(&topology(4, 3), &target(Some(2), None, None)).unwrap(),
            ScalePlan::ScaleDownBrokers { from: 4, to: 2 }
        );
    }

    #[test]
    fn more_brokers_scales_up() {
        assert_eq!(
            plan(&topology(2, 3), &target(Some(4), None, None)).unwrap(),
            ScalePlan::ScaleUpBrokers { from: 2, to: 4 }
        );
    }

    #[test]
    fn broker_change_wins_over_partitions() {
        let chosen = plan(&topology(2, 3), &target(Some(4), Some(6), Some(3))).unwrap();
        assert_eq!(chosen, ScalePlan::ScaleUpBrokers { from: 2, to: 4 });
        assert_eq!(
            chosen.request().unwrap(),
            ClusterPatchRequest::new().with_broker_count(4)
        );
    }

    #[test]
    fn more_partitions_changes_partitions() {
        assert_eq!(
            plan(&topology(3, 3), &target(Some(3), Some(6), Some(2))).unwrap(),
            ScalePlan::ChangePartitions {
                partitions: Some(6),
                replication_factor: Some(2)
            }
        );
    }

    #[test]
    fn replication_factor_alone_changes_partitions() {
        let chosen = plan(&topology(3, 3), &target(None, None, Some(3))).unwrap();
        assert_eq!(
            chosen,
            ScalePlan::ChangePartitions {
                partitions: None,
                replication_factor: Some(3)
            }
        );
        assert_eq!(
            chosen.request().unwrap(),
            ClusterPatchRequest::new().with_partitions(None, Some(3))
        );
    }

    #[test]
    fn replication_factor_with_same_partition_count() {
        assert_eq!(
            plan(&topology(3, 3), &target(None, Some(3), Some(2))).unwrap(),
            ScalePlan::ChangePartitions {
                partitions: None,
                replication_factor: Some(2)
            }
        );
    }

    #[test]
    fn fewer_partitions_is_a_no_op() {
        assert_eq!(
            plan(&topology(3, 6), &target(None, Some(3), None)).unwrap(),
            ScalePlan::NoChange(NoChangeReason::PartitionShrinkUnsupported {
                current: 6,
                requested: 3
            })
        );
    }

    #[test]
    fn same_shape_is_a_no_op() {
        let chosen = plan(&topology(4, 3), &target(Some(4), Some(3), None)).unwrap();
        assert!(matches!(chosen, ScalePlan::NoChange(_)));
        assert!(chosen.request().is_none());

        assert_eq!(
            plan(&topology(4, 3), &target(Some(4), None, None)).unwrap(),
            ScalePlan::NoChange(NoChangeReason::AlreadyAtTarget)
        );
    }
}
