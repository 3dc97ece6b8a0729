//! Compute platform collaborator.
//!
//! The cluster API only changes the logical topology. Broker processes
//! themselves are provisioned by whatever runs the cluster (a Kubernetes
//! operator, a StatefulSet, a VM group). While a change is being applied
//! the platform's own reconciliation must be paused, or it will fight
//! the manual change.

use std::future::Future;

use tracing::warn;

pub trait Platform: Send + Sync {
    /// Provision or release compute so that exactly `brokers` broker
    /// units run.
    fn scale_brokers(&self, brokers: u32) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn pause_reconciliation(&self) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn resume_reconciliation(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Platform for clusters whose capacity is managed by hand: every
/// operation only tells the operator what to do.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualPlatform;

impl Platform for ManualPlatform {
    async fn scale_brokers(&self, brokers: u32) -> anyhow::Result<()> {
        warn!(brokers, "capacity is managed externally: scale broker replicas now");
        Ok(())
    }

    async fn pause_reconciliation(&self) -> anyhow::Result<()> {
        warn!("capacity is managed externally: make sure no controller reconciles the cluster shape");
        Ok(())
    }

    async fn resume_reconciliation(&self) -> anyhow::Result<()> {
        warn!("capacity is managed externally: reconciliation may be resumed");
        Ok(())
    }
}
