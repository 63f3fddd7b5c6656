//! # kg-nodes
//!
//! Permission-gated CRUD over knowledge-graph nodes (topics, lessons, ...).
//!
//! ## Core Contract
//!
//! 1. Every operation checks the caller against a [`PermissionGate`] first
//! 2. Input is parsed only after the gate allows the caller
//! 3. Malformed pagination never fails a listing; it falls back to "unconstrained"
//! 4. Store access goes through the [`NodeStore`] trait (memory or Postgres)
//!
//! ## Architecture
//!
//! ```text
//! Request → IdentitySource → PermissionGate → parse/compose → NodeStore → Envelope
//!                                 ↓
//!                              NodeApi
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod store;
pub mod types;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use auth::{AllowAll, AuthIdentity, PermissionGate, StaticPermissionGate};
pub use config::{ConfigError, ServiceConfig};
pub use error::NodeApiError;
pub use orchestrator::{parse_node, NodeApi, NodeOperation, NodeOutcome};
pub use store::{InMemoryNodeStore, NodeStore};
#[cfg(feature = "postgres")]
pub use store::PostgresNodeStore;
pub use types::{Node, NodeGetOptions, NodeId, NodeType, PaginationDefaults, RawNodeQuery};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};
