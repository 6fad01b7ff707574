//! Turns a matched mock into an HTTP response.

use crate::error::MockError;
use crate::model::{Mock, MockResponse, Violation};
use crate::proxy::ProxyForwarder;
use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

/// Write the mock's stored response, or the upstream's when it proxies.
pub async fn respond(
    mock: &Mock,
    forwarder: &ProxyForwarder,
    parts: &Parts,
    body: Bytes,
) -> Result<Response, MockError> {
    if let Some(host_url) = mock.response.proxy_target() {
        let proxied = forwarder.forward(host_url, parts, body).await?;
        return Ok(json_response(proxied.status, &proxied.body));
    }

    match &mock.response {
        MockResponse::Static { status, body } => {
            let status = StatusCode::from_u16(*status).map_err(|_| {
                MockError::Validation(vec![Violation::new(
                    "status",
                    format!("status - Invalid value: [{}]", status),
                )])
            })?;
            Ok(json_response(status, body))
        }
        MockResponse::Proxy { .. } => Err(MockError::Forwarding(format!(
            "proxy is disabled for mock [id={}]",
            mock.id
        ))),
    }
}

fn json_response(status: StatusCode, body: &Value) -> Response {
    (status, Json(body)).into_response()
}
