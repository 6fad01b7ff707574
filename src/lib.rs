//! Mockery
//!
//! A stub HTTP responder. Clients register mock definitions at runtime, and
//! every other request is answered by the mock that matches it, either with
//! a canned JSON response or by proxying to an upstream host.
//!
//! # Features
//!
//! - **Request Matching**: Match by method, exact or regex path, headers, query params, JSON body
//! - **Static Responses**: Return a fixed status and JSON body
//! - **Proxying**: Forward matched requests to an upstream and mirror its answer
//! - **Management API**: Create, delete, list, import and export mocks over HTTP
//!
//! # Example Mock
//!
//! ```json
//! {
//!   "method": "GET",
//!   "path": "/bar",
//!   "requestQueryMatchers": [ { "key": "id", "value": 3 } ],
//!   "response": { "status": 200, "body": { "foo": true } }
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod files;
pub mod matcher;
pub mod model;
pub mod proxy;
pub mod resolver;
pub mod responder;
pub mod router;
pub mod server;
pub mod store;

pub use config::ServerConfig;
pub use engine::MockEngine;
pub use error::{MockError, StoreError};
pub use model::Mock;
pub use server::MockServer;
pub use store::{InMemoryStore, MockStore};
