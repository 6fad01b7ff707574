//! Upstream forwarding for proxy mocks.
//!
//! One outbound request per call, no timeout and no retry. The inbound
//! method, path, query, headers, and body are cloned onto the mock's host.

use crate::error::MockError;
use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use reqwest::{Client, Request, Url};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Status and decoded body relayed from the upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    /// `{}` when the upstream body is not JSON
    pub body: Value,
}

/// Forwards over `http://` and `https://` with a shared connection pool.
#[derive(Clone, Default)]
pub struct ProxyForwarder {
    client: Client,
}

impl ProxyForwarder {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Send the inbound request to `host_url` and relay the answer.
    pub async fn forward(
        &self,
        host_url: &str,
        parts: &Parts,
        body: Bytes,
    ) -> Result<ProxiedResponse, MockError> {
        let request = build_request(&self.client, host_url, parts, body)?;
        info!(method = %request.method(), target = %request.url(), "Calling proxy target");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| MockError::Forwarding(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MockError::Forwarding(e.to_string()))?;

        let body = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            debug!(error = %e, "Upstream body is not JSON, relaying empty object");
            Value::Object(Map::new())
        });

        Ok(ProxiedResponse { status, body })
    }
}

/// Clone the inbound request onto `host_url`.
///
/// Every header is copied in order, repeated names included, except `Host`
/// which the client derives from the target.
pub fn build_request(
    client: &Client,
    host_url: &str,
    parts: &Parts,
    body: Bytes,
) -> Result<Request, MockError> {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("{}{}", host_url.trim_end_matches('/'), path_and_query);
    let url = Url::parse(&target)
        .map_err(|e| MockError::Forwarding(format!("invalid proxy target {}: {}", target, e)))?;

    let mut request = client
        .request(parts.method.clone(), url)
        .body(body)
        .build()
        .map_err(|e| MockError::Forwarding(e.to_string()))?;

    let headers = request.headers_mut();
    for (name, value) in parts.headers.iter() {
        if name == header::HOST {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    Ok(request)
}
