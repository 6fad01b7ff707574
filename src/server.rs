//! HTTP server setup.
//!
//! axum accepts every path and hands the request to the [`PatternRouter`],
//! which sends management paths to their handlers and everything else to
//! the [`MockEngine`].

use crate::config::ServerConfig;
use crate::engine::MockEngine;
use crate::error::{MockError, StoreError};
use crate::files;
use crate::model::{Mock, Violation};
use crate::router::{PatternRouter, RouteHandler, RouterError};
use crate::store::MockStore;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            MockError::Validation(violations) => {
                let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
                (StatusCode::BAD_REQUEST, Json(messages)).into_response()
            }
            MockError::NotFound
            | MockError::NotMatched
            | MockError::Store(StoreError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, message).into_response()
            }
            MockError::Forwarding(_) => (StatusCode::BAD_GATEWAY, message).into_response(),
            MockError::UnreadableBody(_) => (StatusCode::BAD_REQUEST, message).into_response(),
            MockError::Store(StoreError::Backend(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

/// Shared state behind every route.
pub struct AppContext {
    pub engine: MockEngine,
    pub store: Arc<dyn MockStore>,
    pub config: ServerConfig,
}

impl AppContext {
    pub fn new(config: ServerConfig, store: Arc<dyn MockStore>) -> Self {
        Self {
            engine: MockEngine::new(store.clone(), config.settings.clone()),
            store,
            config,
        }
    }
}

/// Route table in priority order. Management paths come before the mock catch-all.
pub fn build_router(context: Arc<AppContext>) -> Result<PatternRouter, RouterError> {
    PatternRouter::builder()
        .route("^/health$", Arc::new(HealthRoute(context.clone())))?
        .route("^/config/list$", Arc::new(ListRoute(context.clone())))?
        .route("^/config/import$", Arc::new(ImportRoute(context.clone())))?
        .route("^/config/export$", Arc::new(ExportRoute(context.clone())))?
        .route("^/config", Arc::new(ConfigRoute(context.clone())))?
        .catch_all(Arc::new(MockRoute(context)))
        .build()
}

/// HTTP server for the mock responder.
pub struct MockServer {
    app: axum::Router,
    context: Arc<AppContext>,
}

impl MockServer {
    pub fn new(config: ServerConfig, store: Arc<dyn MockStore>) -> Result<Self, RouterError> {
        let context = Arc::new(AppContext::new(config, store));
        let router = Arc::new(build_router(context.clone())?);

        let app = axum::Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(router)
            .layer(TraceLayer::new_for_http());

        Ok(Self { app, context })
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    pub fn into_app(self) -> axum::Router {
        self.app
    }

    /// Serve on `listener` until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch(State(router): State<Arc<PatternRouter>>, request: Request<Body>) -> Response {
    router.dispatch(request).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}

struct HealthRoute(Arc<AppContext>);

#[async_trait]
impl RouteHandler for HealthRoute {
    async fn handle(&self, _request: Request<Body>) -> Response {
        let engine = &self.0.engine;
        let mocks = match self.0.store.list_all() {
            Ok(mocks) => mocks.len(),
            Err(e) => return MockError::from(e).into_response(),
        };
        Json(json!({
            "status": "ok",
            "mocks": mocks,
            "requestsTotal": engine.total_requests(),
            "requestsMatched": engine.total_matched(),
            "requestsUnmatched": engine.total_unmatched(),
        }))
        .into_response()
    }
}

struct ListRoute(Arc<AppContext>);

#[async_trait]
impl RouteHandler for ListRoute {
    async fn handle(&self, request: Request<Body>) -> Response {
        if request.method() != Method::GET {
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }
        match self.0.store.list_all() {
            Ok(mocks) => Json(mocks).into_response(),
            Err(e) => MockError::from(e).into_response(),
        }
    }
}

struct ImportRoute(Arc<AppContext>);

#[async_trait]
impl RouteHandler for ImportRoute {
    async fn handle(&self, request: Request<Body>) -> Response {
        if request.method() != Method::POST {
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }
        match files::import_into_store(self.0.store.as_ref(), &self.0.config.import_dir) {
            Ok(statuses) => Json(statuses).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response(),
        }
    }
}

struct ExportRoute(Arc<AppContext>);

#[async_trait]
impl RouteHandler for ExportRoute {
    async fn handle(&self, request: Request<Body>) -> Response {
        if request.method() != Method::POST {
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }
        let mocks = match self.0.store.list_all() {
            Ok(mocks) => mocks,
            Err(e) => return MockError::from(e).into_response(),
        };
        match files::export_mocks(&self.0.config.export_dir, &mocks) {
            Ok(paths) => {
                let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                Json(paths).into_response()
            }
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response(),
        }
    }
}

/// Create and delete mock definitions.
struct ConfigRoute(Arc<AppContext>);

#[async_trait]
impl RouteHandler for ConfigRoute {
    async fn handle(&self, request: Request<Body>) -> Response {
        let method = request.method().clone();
        if method == Method::POST {
            self.create(request).await.into_response()
        } else if method == Method::DELETE {
            self.delete(&request).into_response()
        } else {
            StatusCode::METHOD_NOT_ALLOWED.into_response()
        }
    }
}

impl ConfigRoute {
    async fn create(&self, request: Request<Body>) -> Result<Response, MockError> {
        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .map_err(|e| MockError::UnreadableBody(e.to_string()))?;
        let mock: Mock = serde_json::from_slice(&bytes).map_err(|e| {
            MockError::Validation(vec![Violation::new(
                "body",
                format!("Malformed mock definition: {}", e),
            )])
        })?;

        let violations = mock.validate();
        if !violations.is_empty() {
            return Err(MockError::Validation(violations));
        }

        let saved = self.0.store.save(mock)?;
        info!(
            mock_id = saved.id,
            method = %saved.method,
            path = saved.exact_path().or(saved.regex_pattern()).unwrap_or_default(),
            "Created new mock"
        );
        Ok((StatusCode::CREATED, Json(saved)).into_response())
    }

    fn delete(&self, request: &Request<Body>) -> Result<Response, MockError> {
        let id = request
            .uri()
            .query()
            .and_then(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .find(|(k, _)| k == "id")
                    .and_then(|(_, v)| v.parse::<i64>().ok())
            })
            .ok_or_else(|| {
                MockError::Validation(vec![Violation::new(
                    "id",
                    "Query parameter 'id' must be an integer",
                )])
            })?;

        self.0.store.delete_by_id(id)?;
        Ok(StatusCode::OK.into_response())
    }
}

/// Everything not claimed by a management route is answered by a mock.
struct MockRoute(Arc<AppContext>);

#[async_trait]
impl RouteHandler for MockRoute {
    async fn handle(&self, request: Request<Body>) -> Response {
        self.0.engine.handle(request).await.into_response()
    }
}
