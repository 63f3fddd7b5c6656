//! Node storage backends.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use crate::types::{Node, NodeGetOptions, NodeId};

/// Trait for node storage backends.
///
/// Implementations must be safe to call concurrently and must return list
/// results in a deterministic order. "Not found" is expressed in the return
/// value, never as an error.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Fetch a node by ID.
    async fn get(&self, id: &NodeId) -> Result<Option<Node>, Self::Error>;

    /// Persist a new node, assigning its ID and timestamps.
    async fn create(&self, node: Node) -> Result<Node, Self::Error>;

    /// Replace an existing node's fields. Returns `None` if no node has the given ID.
    async fn update(&self, node: Node) -> Result<Option<Node>, Self::Error>;

    /// Remove a node. Returns `false` if no node has the given ID.
    async fn delete(&self, id: &NodeId) -> Result<bool, Self::Error>;

    /// List nodes matching the filters, honoring pagination when constrained.
    async fn list(&self, options: &NodeGetOptions) -> Result<Vec<Node>, Self::Error>;

    /// Whether the backend is reachable.
    async fn is_healthy(&self) -> bool {
        true
    }
}

pub use memory::InMemoryNodeStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresNodeStore;
