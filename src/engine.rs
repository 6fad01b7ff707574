//! Mock dispatch engine.
//!
//! Resolves candidates for a request, selects the matching mock, and writes
//! its response. Holds no state between calls apart from request counters.

use crate::config::GlobalSettings;
use crate::error::MockError;
use crate::matcher::{select_mock, IncomingRequest};
use crate::model::Mock;
use crate::proxy::ProxyForwarder;
use crate::resolver::CandidateResolver;
use crate::responder::respond;
use crate::store::MockStore;
use axum::body::Body;
use axum::http::request::Parts;
use axum::http::Request;
use axum::response::Response;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct MockEngine {
    resolver: CandidateResolver,
    forwarder: ProxyForwarder,
    settings: GlobalSettings,
    /// Total requests processed.
    requests_total: AtomicU64,
    /// Total requests answered by a mock.
    requests_matched: AtomicU64,
    /// Total requests no mock answered.
    requests_unmatched: AtomicU64,
}

impl MockEngine {
    pub fn new(store: Arc<dyn MockStore>, settings: GlobalSettings) -> Self {
        Self {
            resolver: CandidateResolver::new(store),
            forwarder: ProxyForwarder::new(),
            settings,
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn total_matched(&self) -> u64 {
        self.requests_matched.load(Ordering::Relaxed)
    }

    pub fn total_unmatched(&self) -> u64 {
        self.requests_unmatched.load(Ordering::Relaxed)
    }

    /// Answer a request from the mock that matches it.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response, MockError> {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| MockError::UnreadableBody(e.to_string()))?;

        let mock = match self.find_mock(&parts, &body) {
            Ok(mock) => mock,
            Err(e) => {
                self.record_miss(&parts, &e);
                return Err(e);
            }
        };

        self.requests_matched.fetch_add(1, Ordering::Relaxed);
        if self.settings.log_matches {
            info!(
                mock_id = mock.id,
                method = %parts.method,
                path = %parts.uri.path(),
                "Request matched mock"
            );
        }

        respond(&mock, &self.forwarder, &parts, body).await
    }

    fn find_mock(&self, parts: &Parts, body: &[u8]) -> Result<Mock, MockError> {
        let request = IncomingRequest::from_parts(parts, body);
        let candidates = self.resolver.resolve(request.method, request.path)?;
        select_mock(candidates, &request)
    }

    fn record_miss(&self, parts: &Parts, err: &MockError) {
        match err {
            MockError::NotFound | MockError::NotMatched => {
                self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                error!(
                    method = %parts.method,
                    path = %parts.uri.path(),
                    error = %err,
                    "Mock lookup failed"
                );
                return;
            }
        }
        if !self.settings.log_unmatched {
            return;
        }
        if matches!(err, MockError::NotFound) {
            warn!(method = %parts.method, path = %parts.uri.path(), "No mock found for request");
        } else {
            warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                "Mocks found but none matched request"
            );
        }
    }
}
