//! zbchaos-client — HTTP access to the cluster management API.
//!
//! Queries the current topology and submits topology change requests.
//!
//! # Protocol generations
//!
//! ```text
//! submit_change()
//!   ├── PATCH <endpoint>/cluster?force=..        (unified)
//!   │     ├── 2xx → ChangeResponse
//!   │     ├── 405 → retry once below
//!   │     └── other → ClientError::Rejected
//!   └── POST <endpoint>/cluster/brokers?force=..  (legacy, broker list body)
//! ```
//!
//! Partition count changes cannot be expressed on the legacy endpoint and
//! fail with `ClientError::LegacyUnsupported` instead of being sent.

pub mod client;
pub mod error;
pub mod request;
pub mod transport;

pub use client::{ClusterApi, HttpClusterClient};
pub use error::{ClientError, ClientResult};
pub use request::{BrokerDelta, ChangeProtocol, ClusterPatchRequest, LegacyBrokerRequest, PartitionDelta};
