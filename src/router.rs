//! Ordered pattern routing.
//!
//! Routes are tested in registration order against the request path using
//! unanchored regex search. The first route whose pattern is found in the
//! path handles the request. A catch-all is mandatory and always runs last.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

/// Pattern the catch-all route is registered under.
pub const CATCH_ALL: &str = ".*";

/// Handles a request routed to it by [`PatternRouter`].
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, request: Request<Body>) -> Response;
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid route pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no catch-all route registered")]
    MissingCatchAll,
}

struct Route {
    pattern: Regex,
    handler: Arc<dyn RouteHandler>,
}

/// Builder collecting routes in priority order.
#[derive(Default)]
pub struct PatternRouterBuilder {
    routes: Vec<Route>,
    catch_all: Option<Arc<dyn RouteHandler>>,
}

impl PatternRouterBuilder {
    /// Append a route. Earlier routes take priority.
    pub fn route(
        mut self,
        pattern: &str,
        handler: Arc<dyn RouteHandler>,
    ) -> Result<Self, RouterError> {
        let pattern = Regex::new(pattern).map_err(|source| RouterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.routes.push(Route { pattern, handler });
        Ok(self)
    }

    /// Set the handler for requests no other route matches.
    pub fn catch_all(mut self, handler: Arc<dyn RouteHandler>) -> Self {
        self.catch_all = Some(handler);
        self
    }

    pub fn build(self) -> Result<PatternRouter, RouterError> {
        let catch_all = self.catch_all.ok_or(RouterError::MissingCatchAll)?;
        Ok(PatternRouter {
            routes: self.routes,
            catch_all,
        })
    }
}

/// First-match-wins dispatcher over an ordered route list.
pub struct PatternRouter {
    routes: Vec<Route>,
    catch_all: Arc<dyn RouteHandler>,
}

impl PatternRouter {
    pub fn builder() -> PatternRouterBuilder {
        PatternRouterBuilder::default()
    }

    /// Registered patterns in the order they are tried, ending with the catch-all.
    pub fn patterns(&self) -> Vec<&str> {
        self.routes
            .iter()
            .map(|r| r.pattern.as_str())
            .chain(std::iter::once(CATCH_ALL))
            .collect()
    }

    fn select(&self, path: &str) -> &Arc<dyn RouteHandler> {
        self.routes
            .iter()
            .find(|r| r.pattern.is_match(path))
            .map(|r| &r.handler)
            .unwrap_or(&self.catch_all)
    }

    /// Hand the request to the first route whose pattern occurs in its path.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let handler = self.select(request.uri().path()).clone();
        handler.handle(request).await
    }
}
