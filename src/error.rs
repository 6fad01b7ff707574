//! Error taxonomy for mock resolution, matching, and forwarding.

use crate::model::Violation;
use thiserror::Error;

/// Failures raised by the mock store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No mock with the given id exists.
    #[error("mock [id={0}] not found")]
    NotFound(i64),

    /// The storage backend failed.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Failures raised while handling a mock request or definition.
#[derive(Debug, Error)]
pub enum MockError {
    /// The mock definition is malformed or incomplete.
    #[error("invalid mock definition: {}", format_violations(.0))]
    Validation(Vec<Violation>),

    /// No candidates exist for the method and path.
    #[error("not found")]
    NotFound,

    /// Candidates exist but none satisfies its matchers.
    #[error("not matched")]
    NotMatched,

    /// The upstream could not be reached or the request could not be built.
    #[error("proxy forwarding failed: {0}")]
    Forwarding(String),

    /// The inbound request body could not be read.
    #[error("failed to read request body: {0}")]
    UnreadableBody(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
