//! Change watcher: polls the topology until a change reaches a terminal
//! state.
//!
//! The cluster never pushes change notifications. Every iteration re-reads
//! the topology and re-classifies the tracked change from scratch; nothing
//! observed in an earlier iteration is trusted.
//!
//! ```text
//!            ┌──────────┐  visible   ┌─────────┐
//!  start ──► │ UNKNOWN  │ ─────────► │ PENDING │ ──┐
//!            └──────────┘            └─────────┘   │
//!                 │                                ▼
//!                 └──────► COMPLETED | OUTDATED (ok) | FAILED (error)
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use zbchaos_client::ClusterApi;
use zbchaos_core::{ChangeId, ChangeStatus, ChaosConfig, Topology, classify};

use crate::error::{ScaleError, ScaleResult};

/// Poll cadence and wall-clock bound for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl WatchSettings {
    /// Settings for ordinary waits.
    pub fn from_config(config: &ChaosConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.watch_timeout(),
        }
    }

    /// Settings for waits after a scale down.
    pub fn scale_down(config: &ChaosConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.scale_down_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self::from_config(&ChaosConfig::default())
    }
}

/// Successful end of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Completed { change_id: ChangeId },
    /// A newer change already finished; the tracked one is assumed to have
    /// completed before it.
    Outdated { change_id: ChangeId, latest: ChangeId },
    /// No change was given and the cluster has never had one.
    NothingToTrack,
}

impl WatchOutcome {
    pub fn change_id(&self) -> Option<ChangeId> {
        match self {
            WatchOutcome::Completed { change_id } | WatchOutcome::Outdated { change_id, .. } => {
                Some(*change_id)
            }
            WatchOutcome::NothingToTrack => None,
        }
    }
}

/// Watches one change through the cluster API.
pub struct ChangeWatcher<'a, C> {
    api: &'a C,
    settings: WatchSettings,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<'a, C: ClusterApi> ChangeWatcher<'a, C> {
    pub fn new(api: &'a C, settings: WatchSettings) -> Self {
        Self {
            api,
            settings,
            shutdown: None,
        }
    }

    /// Abort the wait with [`ScaleError::Cancelled`] once `true` is sent.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Wait for `change_id` to reach a terminal state.
    ///
    /// Without an id (or with an id `<= 0`) the pending change is tracked,
    /// falling back to the last change. Transport and decode failures are
    /// logged and retried on the next tick; any other client error ends the
    /// wait.
    pub async fn wait(&self, change_id: Option<ChangeId>) -> ScaleResult<WatchOutcome> {
        let WatchSettings {
            poll_interval,
            timeout,
        } = self.settings;
        let deadline = Instant::now() + timeout;
        let mut shutdown = self.shutdown.clone();
        let mut tracked = change_id.filter(|&id| id > 0);
        let mut iteration: u64 = 0;

        loop {
            iteration += 1;

            let query = tokio::time::timeout_at(deadline, self.api.query_topology());
            let polled = tokio::select! {
                polled = query => polled,
                _ = cancelled(&mut shutdown) => return Err(ScaleError::Cancelled),
            };

            match polled {
                Err(_) => break,
                Ok(Err(e)) if e.is_transient() => {
                    warn!(error = %e, iteration, "failed to query topology")
                }
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(topology)) => {
                    if let Some(outcome) = observe(&topology, &mut tracked)? {
                        return Ok(outcome);
                    }
                }
            }

            let wake = (Instant::now() + poll_interval).min(deadline);
            debug!(
                iteration,
                interval = ?poll_interval,
                "waiting before checking topology again"
            );
            tokio::select! {
                _ = tokio::time::sleep_until(wake) => {}
                _ = cancelled(&mut shutdown) => return Err(ScaleError::Cancelled),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        warn!(change_id = ?tracked, ?timeout, "gave up waiting for change");
        Err(ScaleError::Timeout {
            change_id: tracked,
            timeout,
        })
    }
}

/// Evaluate one snapshot. `Ok(None)` means keep polling.
///
/// Adopts a change id from the snapshot when none is tracked yet.
pub fn observe(
    topology: &Topology,
    tracked: &mut Option<ChangeId>,
) -> ScaleResult<Option<WatchOutcome>> {
    let change_id = match *tracked {
        Some(id) => id,
        None => {
            let adopted = topology
                .pending_change
                .as_ref()
                .map(|c| c.id)
                .or_else(|| topology.last_change.as_ref().map(|c| c.id));
            match adopted {
                Some(id) => {
                    info!(change_id = id, "tracking latest change");
                    *tracked = Some(id);
                    id
                }
                None => {
                    info!("no change exists");
                    return Ok(Some(WatchOutcome::NothingToTrack));
                }
            }
        }
    };

    let status = classify(topology, change_id);
    debug!(change_id, %status, terminal = status.is_terminal(), "classified change");
    match status {
        ChangeStatus::Completed => {
            info!(change_id, "change completed successfully");
            Ok(Some(WatchOutcome::Completed { change_id }))
        }
        ChangeStatus::Failed => {
            let status = topology
                .last_change
                .as_ref()
                .map(|c| c.status.clone())
                .unwrap_or_default();
            warn!(change_id, %status, "change failed");
            Err(ScaleError::ChangeFailed { change_id, status })
        }
        ChangeStatus::Outdated => {
            let latest = topology.last_change.as_ref().map_or(change_id, |c| c.id);
            info!(
                change_id,
                latest, "change is outdated but most likely completed successfully"
            );
            Ok(Some(WatchOutcome::Outdated { change_id, latest }))
        }
        ChangeStatus::Pending => {
            if let Some(pending) = &topology.pending_change {
                let (completed, total) = pending.progress();
                info!(
                    change_id,
                    status = %pending.status,
                    "change in progress: {completed}/{total} operations complete"
                );
            }
            Ok(None)
        }
        ChangeStatus::Unknown => {
            info!(change_id, "change not yet started");
            Ok(None)
        }
    }
}

/// Resolves once the shutdown flag is set. Never resolves without a
/// receiver or after the sender is gone.
pub(crate) async fn cancelled(shutdown: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = shutdown else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
