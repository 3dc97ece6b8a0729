//! zbchaos-scale — resize a cluster through its management API.
//!
//! Reads the current topology, decides on one change, submits it, and
//! polls until the cluster reports the change as finished.
//!
//! # Architecture
//!
//! ```text
//! ScalingPlanner::scale(target)
//!   ├── ClusterApi::query_topology()      fresh snapshot, never cached
//!   ├── plan()                            one ScalePlan or AlreadyScaling
//!   ├── Platform::pause_reconciliation()
//!   ├── ClusterApi::submit_change()       unified PATCH, legacy POST on 405
//!   ├── Platform::scale_brokers()         before the wait when growing,
//!   │                                     after it when shrinking
//!   └── ChangeWatcher::wait(change_id)    poll + classify until terminal
//!
//! ForcedFailover::run(brokers, layout)
//!   ├── wait for the expected broker count
//!   ├── brokers_outside_region()
//!   └── forced remove + ChangeWatcher::wait
//! ```
//!
//! Only one change may be in flight cluster-wide. That is enforced by the
//! cluster itself: a pending change in the fresh snapshot aborts the call.

pub mod error;
pub mod failover;
pub mod planner;
pub mod platform;
pub mod watcher;

pub use error::{ScaleError, ScaleResult};
pub use failover::{FailoverReport, ForcedFailover};
pub use planner::{NoChangeReason, ScalePlan, ScaleReport, ScaleTarget, ScalingPlanner, plan};
pub use platform::{ManualPlatform, Platform};
pub use watcher::{ChangeWatcher, WatchOutcome, WatchSettings};
