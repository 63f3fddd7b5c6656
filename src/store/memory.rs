//! In-memory node store for development and testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::types::{Node, NodeGetOptions, NodeId};
use super::NodeStore;

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Store was switched offline.
    #[error("node store unavailable")]
    Unavailable,
}

/// In-memory node store.
///
/// Uses a BTreeMap for deterministic iteration order. Listing orders by
/// name, then ID.
#[derive(Debug)]
pub struct InMemoryNodeStore {
    nodes: RwLock<BTreeMap<NodeId, Node>>,
    available: AtomicBool,
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryNodeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node as-is, assigning an ID if it has none.
    pub fn insert(&self, mut node: Node) -> NodeId {
        let id = *node.id.get_or_insert_with(NodeId::generate);
        self.nodes.write().insert(id, node);
        id
    }

    /// Get number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.read().len()
    }

    /// Toggle availability. While offline every operation fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), InMemoryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(InMemoryError::Unavailable)
        }
    }
}

#[async_trait]
impl NodeStore for InMemoryNodeStore {
    type Error = InMemoryError;

    async fn get(&self, id: &NodeId) -> Result<Option<Node>, Self::Error> {
        self.check_available()?;
        Ok(self.nodes.read().get(id).cloned())
    }

    async fn create(&self, mut node: Node) -> Result<Node, Self::Error> {
        self.check_available()?;
        let now = Utc::now();
        let id = NodeId::generate();
        node.id = Some(id);
        node.created_at = Some(now);
        node.updated_at = Some(now);
        self.nodes.write().insert(id, node.clone());
        Ok(node)
    }

    async fn update(&self, mut node: Node) -> Result<Option<Node>, Self::Error> {
        self.check_available()?;
        let Some(id) = node.id else {
            return Ok(None);
        };
        let mut nodes = self.nodes.write();
        let Some(existing) = nodes.get_mut(&id) else {
            return Ok(None);
        };
        node.created_at = existing.created_at;
        node.updated_at = Some(Utc::now());
        *existing = node.clone();
        Ok(Some(node))
    }

    async fn delete(&self, id: &NodeId) -> Result<bool, Self::Error> {
        self.check_available()?;
        Ok(self.nodes.write().remove(id).is_some())
    }

    async fn list(&self, options: &NodeGetOptions) -> Result<Vec<Node>, Self::Error> {
        self.check_available()?;
        let mut matching: Vec<Node> = self
            .nodes
            .read()
            .values()
            .filter(|n| options.matches(&n.name, &n.description))
            .cloned()
            .collect();

        matching.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(match options.limit_offset() {
            Some((limit, offset)) => matching
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => matching,
        })
    }

    async fn is_healthy(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
