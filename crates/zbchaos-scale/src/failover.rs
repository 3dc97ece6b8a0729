//! Forced regional failover.
//!
//! Simulates losing every region but one: once the topology shows the
//! expected number of brokers, all brokers outside the target region are
//! force-removed and the resulting change is watched to completion.

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};
use zbchaos_client::{ClusterApi, ClusterPatchRequest};
use zbchaos_core::{BrokerId, ChangeId, RegionLayout, Topology, brokers_outside_region};

use crate::error::{ScaleError, ScaleResult};
use crate::watcher::{ChangeWatcher, WatchOutcome, WatchSettings, cancelled};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverReport {
    pub removed: Vec<BrokerId>,
    pub change_id: Option<ChangeId>,
    pub outcome: Option<WatchOutcome>,
}

pub struct ForcedFailover<'a, C> {
    api: &'a C,
    /// Bound for the initial wait on the expected broker count.
    ready: WatchSettings,
    /// Bound for the forced change itself.
    change: WatchSettings,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<'a, C: ClusterApi> ForcedFailover<'a, C> {
    pub fn new(api: &'a C, ready: WatchSettings, change: WatchSettings) -> Self {
        Self {
            api,
            ready,
            change,
            shutdown: None,
        }
    }

    /// Abort both waits with [`ScaleError::Cancelled`] once `true` is sent.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub async fn run(&self, expected_brokers: u32, layout: RegionLayout) -> ScaleResult<FailoverReport> {
        let topology = self.wait_for_brokers(expected_brokers).await?;

        if let Some(pending) = &topology.pending_change {
            return Err(ScaleError::AlreadyScaling {
                change_id: pending.id,
            });
        }

        let removed = brokers_outside_region(&topology, layout);
        if removed.is_empty() {
            info!(
                regions = layout.regions(),
                region = layout.target(),
                "all brokers already live in the target region"
            );
            return Ok(FailoverReport {
                removed,
                change_id: None,
                outcome: None,
            });
        }

        info!(
            regions = layout.regions(),
            region = layout.target(),
            brokers = ?removed,
            "forcing removal of brokers outside the target region"
        );
        let request = ClusterPatchRequest::new().with_brokers_removed(removed.clone());
        let response = self.api.submit_change(&request, true).await?;

        let mut watcher = ChangeWatcher::new(self.api, self.change);
        if let Some(rx) = &self.shutdown {
            watcher = watcher.with_shutdown(rx.clone());
        }
        let outcome = watcher.wait(Some(response.change_id)).await?;

        Ok(FailoverReport {
            removed,
            change_id: Some(response.change_id),
            outcome: Some(outcome),
        })
    }

    /// Poll until the topology lists exactly `expected` brokers.
    async fn wait_for_brokers(&self, expected: u32) -> ScaleResult<Topology> {
        let deadline = Instant::now() + self.ready.timeout;
        let mut observed = None;
        let mut shutdown = self.shutdown.clone();

        loop {
            let query = tokio::time::timeout_at(deadline, self.api.query_topology());
            let polled = tokio::select! {
                polled = query => polled,
                _ = cancelled(&mut shutdown) => return Err(ScaleError::Cancelled),
            };

            match polled {
                Err(_) => break,
                Ok(Err(e)) if e.is_transient() => warn!(error = %e, "failed to query topology"),
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(topology)) => {
                    if topology.broker_count() == expected as usize {
                        return Ok(topology);
                    }
                    info!(
                        expected,
                        actual = topology.broker_count(),
                        "waiting for brokers to join the topology"
                    );
                    observed = Some(topology.broker_count());
                }
            }

            let wake = (Instant::now() + self.ready.poll_interval).min(deadline);
            tokio::select! {
                _ = tokio::time::sleep_until(wake) => {}
                _ = cancelled(&mut shutdown) => return Err(ScaleError::Cancelled),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        Err(ScaleError::BrokersNotReady {
            expected,
            observed,
            timeout: self.ready.timeout,
        })
    }
}
