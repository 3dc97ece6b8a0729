//! Scripted cluster and platform fakes shared by the scenario tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use http::StatusCode;
use zbchaos_client::{ClientError, ClientResult, ClusterApi, ClusterPatchRequest};
use zbchaos_core::{
    BrokerState, ChangeId, ChangeResponse, LastChange, Operation, PartitionState, PendingChange,
    Topology,
};
use zbchaos_scale::Platform;

/// Ordered log of everything the fakes were asked to do.
pub type Events = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone)]
pub enum Reply {
    Snapshot(Topology),
    Unreachable,
    /// Non-200 answer to the topology query.
    Rejected(StatusCode),
}

/// Answers topology queries from a script. Once the script runs out the
/// last reply is repeated.
pub struct FakeCluster {
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    submissions: Mutex<Vec<(ClusterPatchRequest, bool)>>,
    next_change_id: ChangeId,
    reject_submissions: bool,
    events: Events,
}

impl FakeCluster {
    pub fn new(events: Events, next_change_id: ChangeId, script: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            submissions: Mutex::new(Vec::new()),
            next_change_id,
            reject_submissions: false,
            events,
        }
    }

    pub fn rejecting_submissions(mut self) -> Self {
        self.reject_submissions = true;
        self
    }

    pub fn submissions(&self) -> Vec<(ClusterPatchRequest, bool)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == "query")
            .count()
    }

    fn next_reply(&self) -> Reply {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(reply) = script.pop_front() {
            *last = Some(reply);
        }
        last.clone().unwrap_or(Reply::Unreachable)
    }
}

impl ClusterApi for FakeCluster {
    async fn query_topology(&self) -> ClientResult<Topology> {
        self.events.lock().unwrap().push("query".to_string());
        match self.next_reply() {
            Reply::Snapshot(topology) => Ok(topology),
            Reply::Unreachable => Err(ClientError::Transport("connection refused".to_string())),
            Reply::Rejected(status) => Err(ClientError::Rejected {
                status,
                body: "no such endpoint".to_string(),
            }),
        }
    }

    async fn submit_change(
        &self,
        request: &ClusterPatchRequest,
        force: bool,
    ) -> ClientResult<ChangeResponse> {
        self.events.lock().unwrap().push("submit".to_string());
        if self.reject_submissions {
            return Err(ClientError::Transport("connection reset".to_string()));
        }
        self.submissions
            .lock()
            .unwrap()
            .push((request.clone(), force));
        Ok(ChangeResponse {
            change_id: self.next_change_id,
            ..Default::default()
        })
    }
}

/// Platform that only records calls.
pub struct RecordingPlatform {
    events: Events,
}

impl RecordingPlatform {
    pub fn new(events: Events) -> Self {
        Self { events }
    }
}

impl Platform for RecordingPlatform {
    async fn scale_brokers(&self, brokers: u32) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("scale_brokers({brokers})"));
        Ok(())
    }

    async fn pause_reconciliation(&self) -> anyhow::Result<()> {
        self.events.lock().unwrap().push("pause".to_string());
        Ok(())
    }

    async fn resume_reconciliation(&self) -> anyhow::Result<()> {
        self.events.lock().unwrap().push("resume".to_string());
        Ok(())
    }
}

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn recorded(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

/// `brokers` brokers, each hosting partitions `1..=partitions`.
pub fn topology(brokers: i32, partitions: i32) -> Topology {
    Topology {
        version: 1,
        cluster_id: Some("test-cluster".to_string()),
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

pub fn with_last(mut topology: Topology, id: ChangeId, status: &str) -> Topology {
    topology.last_change = Some(LastChange {
        id,
        status: status.to_string(),
        started_at: None,
        completed_at: None,
    });
    topology
}

pub fn with_pending(mut topology: Topology, id: ChangeId, done: i32, remaining: i32) -> Topology {
    let op = |broker_id| Operation {
        operation: "BROKER_ADD".to_string(),
        broker_id,
        partition_id: None,
        priority: None,
    };
    topology.pending_change = Some(PendingChange {
        id,
        status: "IN_PROGRESS".to_string(),
        internal_version: 1,
        completed: (0..done).map(op).collect(),
        pending: (0..remaining).map(op).collect(),
    });
    topology
}

pub fn snapshot(topology: Topology) -> Reply {
    Reply::Snapshot(topology)
}
