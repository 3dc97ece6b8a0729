//! Minimal HTTP/1.1 transport over hyper.
//!
//! One TCP connection per request; the management endpoint is usually
//! reached through a port-forward that does not keep connections alive
//! reliably.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

const AGENT: &str = concat!("zbchaos/", env!("CARGO_PKG_VERSION"));

/// Parsed base URL of the management API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `host:port` used for both the TCP connect and the Host header.
    address: String,
    /// Path prefix without trailing slash, e.g. `/actuator`.
    base_path: String,
}

impl Endpoint {
    pub fn parse(endpoint: &str) -> ClientResult<Self> {
        let invalid = |reason: &str| ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = endpoint.parse().map_err(|_| invalid("not a valid URI"))?;
        if uri.scheme_str() != Some("http") {
            return Err(invalid("only http:// endpoints are supported"));
        }
        let host = uri.host().ok_or_else(|| invalid("missing host"))?;
        let port = uri.port_u16().unwrap_or(80);

        Ok(Self {
            address: format!("{host}:{port}"),
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Origin-form request target for `path_and_query` below the base path.
    pub fn target(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_path, path_and_query)
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.address, self.target(path_and_query))
    }
}

/// Send a single request and read the whole response body.
///
/// Connection failures, handshake errors and the `timeout` all surface as
/// [`ClientError::Transport`]; any HTTP status is returned to the caller.
pub async fn send(
    endpoint: &Endpoint,
    method: Method,
    path_and_query: &str,
    json_body: Option<Vec<u8>>,
    timeout: Duration,
) -> ClientResult<(StatusCode, Bytes)> {
    let target = endpoint.target(path_and_query);

    let exchange = async {
        let stream = tokio::net::TcpStream::connect(endpoint.address())
            .await
            .map_err(|e| ClientError::Transport(format!("connect {}: {e}", endpoint.address())))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ClientError::Transport(format!("handshake: {e}")))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "cluster API connection closed with error");
            }
        });

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(&target)
            .header(HOST, endpoint.address())
            .header(USER_AGENT, AGENT);
        let body = match json_body {
            Some(bytes) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Full::new(Bytes::from(bytes))
            }
            None => Full::new(Bytes::new()),
        };
        let request = builder
            .body(body)
            .map_err(|e| ClientError::Transport(format!("build request: {e}")))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| ClientError::Transport(format!("send {method} {target}: {e}")))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Transport(format!("read body: {e}")))?
            .to_bytes();

        debug!(%method, %target, %status, bytes = body.len(), "cluster API response");
        Ok::<_, ClientError>((status, body))
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Transport(format!(
            "{method} {target} timed out after {timeout:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_endpoint_with_base_path() {
        let endpoint = Endpoint::parse("http://localhost:9600/actuator/").unwrap();
        assert_eq!(endpoint.address(), "localhost:9600");
        assert_eq!(endpoint.target("/cluster?force=false"), "/actuator/cluster?force=false");
        assert_eq!(
            endpoint.url("/cluster"),
            "http://localhost:9600/actuator/cluster"
        );
    }

    #[test]
    fn parse_endpoint_defaults_port() {
        let endpoint = Endpoint::parse("http://zeebe-gateway").unwrap();
        assert_eq!(endpoint.address(), "zeebe-gateway:80");
        assert_eq!(endpoint.target("/cluster"), "/cluster");
    }

    #[test]
    fn parse_endpoint_rejects_https() {
        assert!(matches!(
            Endpoint::parse("https://localhost:9600"),
            Err(ClientError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn parse_endpoint_rejects_garbage() {
        assert!(Endpoint::parse("not a url").is_err());
    }

    #[tokio::test]
    async fn send_to_closed_port_is_transport_error() {
        let endpoint = Endpoint::parse("http://127.0.0.1:1").unwrap();
        let result = send(
            &endpoint,
            Method::GET,
            "/cluster",
            None,
            Duration::from_millis(500),
        )
        .await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
