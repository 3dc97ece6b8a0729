//! Cluster management API client.

use std::future::Future;
use std::time::Duration;

use http::{Method, StatusCode};
use tracing::{debug, info};
use zbchaos_core::{BrokerId, ChangeResponse, ChaosConfig, Topology};

use crate::error::{ClientError, ClientResult};
use crate::request::{
    CLUSTER_PATH, ChangeProtocol, ClusterPatchRequest, LegacyBrokerRequest,
    unified_path_and_query,
};
use crate::transport::{self, Endpoint};

/// Operations the scaling logic needs from the cluster.
///
/// Implemented over HTTP by [`HttpClusterClient`]; tests substitute
/// scripted fakes.
pub trait ClusterApi: Send + Sync {
    /// Fetch a fresh topology snapshot, brokers sorted by id.
    fn query_topology(&self) -> impl Future<Output = ClientResult<Topology>> + Send;

    /// Submit a change request and return the id the cluster assigned.
    fn submit_change(
        &self,
        request: &ClusterPatchRequest,
        force: bool,
    ) -> impl Future<Output = ClientResult<ChangeResponse>> + Send;
}

/// HTTP client for the `/cluster` actuator.
#[derive(Debug, Clone)]
pub struct HttpClusterClient {
    endpoint: Endpoint,
    request_timeout: Duration,
}

impl HttpClusterClient {
    pub fn new(endpoint: &str, request_timeout: Duration) -> ClientResult<Self> {
        Ok(Self {
            endpoint: Endpoint::parse(endpoint)?,
            request_timeout,
        })
    }

    pub fn from_config(config: &ChaosConfig) -> ClientResult<Self> {
        Self::new(&config.cluster.endpoint, config.request_timeout())
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Submit `request` using one specific protocol generation, without
    /// any fallback.
    pub async fn submit_with(
        &self,
        protocol: ChangeProtocol,
        request: &ClusterPatchRequest,
        force: bool,
    ) -> ClientResult<ChangeResponse> {
        match protocol {
            ChangeProtocol::Unified => self.patch_cluster(request, force).await,
            ChangeProtocol::Legacy => {
                let current = if request.needs_current_brokers() {
                    self.query_topology().await?.broker_ids()
                } else {
                    Vec::<BrokerId>::new()
                };
                let legacy = LegacyBrokerRequest::from_patch(request, &current)?;
                self.post_legacy(&legacy, force).await
            }
        }
    }

    async fn patch_cluster(
        &self,
        request: &ClusterPatchRequest,
        force: bool,
    ) -> ClientResult<ChangeResponse> {
        let path = unified_path_and_query(force);
        let body = request.to_json()?;
        info!(
            url = %self.endpoint.url(&path),
            body = %String::from_utf8_lossy(&body),
            "requesting cluster change"
        );

        let (status, bytes) = transport::send(
            &self.endpoint,
            Method::PATCH,
            &path,
            Some(body),
            self.request_timeout,
        )
        .await?;

        if status == StatusCode::METHOD_NOT_ALLOWED {
            return Err(ClientError::MethodNotAllowed {
                path: self.endpoint.target(CLUSTER_PATH),
            });
        }
        decode_change_response(status, &bytes)
    }

    async fn post_legacy(
        &self,
        request: &LegacyBrokerRequest,
        force: bool,
    ) -> ClientResult<ChangeResponse> {
        let path = request.path_and_query(force);
        let body = request.to_json()?;
        info!(
            url = %self.endpoint.url(&path),
            brokers = ?request.broker_ids,
            "requesting cluster change via legacy broker endpoint"
        );

        let (status, bytes) = transport::send(
            &self.endpoint,
            Method::POST,
            &path,
            Some(body),
            self.request_timeout,
        )
        .await?;
        decode_change_response(status, &bytes)
    }
}

impl ClusterApi for HttpClusterClient {
    async fn query_topology(&self) -> ClientResult<Topology> {
        let (status, bytes) = transport::send(
            &self.endpoint,
            Method::GET,
            CLUSTER_PATH,
            None,
            self.request_timeout,
        )
        .await?;

        if status != StatusCode::OK {
            return Err(ClientError::Rejected {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let mut topology: Topology = serde_json::from_slice(&bytes)?;
        topology.sort_brokers();
        Ok(topology)
    }

    async fn submit_change(
        &self,
        request: &ClusterPatchRequest,
        force: bool,
    ) -> ClientResult<ChangeResponse> {
        match self.submit_with(ChangeProtocol::Unified, request, force).await {
            Err(ClientError::MethodNotAllowed { path }) => {
                info!(%path, "PATCH not supported by this cluster version, falling back to legacy endpoint");
                self.submit_with(ChangeProtocol::Legacy, request, force).await
            }
            other => other,
        }
    }
}

fn decode_change_response(status: StatusCode, bytes: &[u8]) -> ClientResult<ChangeResponse> {
    debug!(%status, body = %String::from_utf8_lossy(bytes), "change response");
    if !status.is_success() {
        return Err(ClientError::Rejected {
            status,
            body: String::from_utf8_lossy(bytes).into_owned(),
        });
    }
    let response: ChangeResponse = serde_json::from_slice(bytes)?;
    info!(
        change_id = response.change_id,
        planned = response.planned_changes.len(),
        "change accepted"
    );
    Ok(response)
}
