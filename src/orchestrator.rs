//! Permission-gated node operations.
//!
//! Every operation runs the same linear pipeline and stops at the first
//! failure:
//!
//! ```text
//! identity → PermissionGate → parse input → NodeStore → NodeOutcome
//! ```
//!
//! Nothing is parsed and no store call is made until the gate has allowed
//! the caller.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::auth::{AuthIdentity, PermissionGate};
use crate::error::NodeApiError;
use crate::store::NodeStore;
use crate::types::{Node, NodeGetOptions, NodeId, PaginationDefaults, RawNodeQuery};

/// Message for a failed create; the store's error text is not exposed.
pub const CREATE_FAILED: &str = "Error while creating node";

/// Message for a delete without `node_id`.
pub const MISSING_NODE_ID: &str = "missing node_id";

/// Successful result of a node operation.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// Node was stored; carries the stored node.
    Created(Node),
    /// Listing result, possibly empty.
    List(Vec<Node>),
    /// Node was updated.
    Updated,
    /// Node was deleted.
    Deleted,
}

impl NodeOutcome {
    /// HTTP status code for this outcome.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Created(_) => 201,
            Self::List(_) | Self::Updated | Self::Deleted => 200,
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Created(_) => "Node created",
            Self::List(_) => "",
            Self::Updated => "Node updated",
            Self::Deleted => "Node deleted",
        }
    }
}

/// Operation names used in audit logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOperation {
    /// POST
    Create,
    /// GET
    List,
    /// PUT
    Update,
    /// DELETE
    Delete,
}

impl NodeOperation {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::List => "list",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Orchestrates node CRUD against a store, gated by a permission check.
pub struct NodeApi<S: NodeStore + 'static, G: PermissionGate + 'static> {
    store: Arc<S>,
    gate: Arc<G>,
    pagination: PaginationDefaults,
}

impl<S: NodeStore + 'static, G: PermissionGate + 'static> NodeApi<S, G> {
    /// Create an orchestrator with the default pagination sentinels.
    pub fn new(store: S, gate: G) -> Self {
        Self::from_parts(Arc::new(store), Arc::new(gate), PaginationDefaults::default())
    }

    /// Create an orchestrator from shared parts.
    pub fn from_parts(store: Arc<S>, gate: Arc<G>, pagination: PaginationDefaults) -> Self {
        Self { store, gate, pagination }
    }

    /// Override the pagination sentinels used for listing.
    pub fn with_pagination(mut self, pagination: PaginationDefaults) -> Self {
        self.pagination = pagination;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Pagination sentinels used for listing.
    pub fn pagination(&self) -> PaginationDefaults {
        self.pagination
    }

    /// Create a node from a JSON body.
    pub async fn create(
        &self,
        identity: &AuthIdentity,
        body: &[u8],
    ) -> Result<NodeOutcome, NodeApiError> {
        let result = self.create_inner(identity, body).await;
        audit(NodeOperation::Create, identity, &result);
        result
    }

    async fn create_inner(
        &self,
        identity: &AuthIdentity,
        body: &[u8],
    ) -> Result<NodeOutcome, NodeApiError> {
        self.authorize(identity).await?;
        let node = parse_node(body)?;

        let created = self.store.create(node).await.map_err(|e| {
            error!(error = %e, "node store create failed");
            NodeApiError::Internal(CREATE_FAILED.to_string())
        })?;
        Ok(NodeOutcome::Created(created))
    }

    /// List nodes using raw query parameters.
    pub async fn list(
        &self,
        identity: &AuthIdentity,
        query: &RawNodeQuery,
    ) -> Result<NodeOutcome, NodeApiError> {
        let result = self.list_inner(identity, query).await;
        audit(NodeOperation::List, identity, &result);
        result
    }

    async fn list_inner(
        &self,
        identity: &AuthIdentity,
        query: &RawNodeQuery,
    ) -> Result<NodeOutcome, NodeApiError> {
        self.authorize(identity).await?;
        let options = query.compose(self.pagination);
        debug!(?options, "listing nodes");
        self.list_with(&options).await
    }

    async fn list_with(&self, options: &NodeGetOptions) -> Result<NodeOutcome, NodeApiError> {
        let nodes = self.store.list(options).await.map_err(store_failure)?;
        Ok(NodeOutcome::List(nodes))
    }

    /// Update a node from a JSON body that carries its `id`.
    pub async fn update(
        &self,
        identity: &AuthIdentity,
        body: &[u8],
    ) -> Result<NodeOutcome, NodeApiError> {
        let result = self.update_inner(identity, body).await;
        audit(NodeOperation::Update, identity, &result);
        result
    }

    async fn update_inner(
        &self,
        identity: &AuthIdentity,
        body: &[u8],
    ) -> Result<NodeOutcome, NodeApiError> {
        self.authorize(identity).await?;
        let node = parse_node(body)?;
        if node.id.is_none() {
            return Err(NodeApiError::invalid_body());
        }

        match self.store.update(node).await.map_err(store_failure)? {
            Some(_) => Ok(NodeOutcome::Updated),
            None => Err(NodeApiError::unknown_node()),
        }
    }

    /// Delete the node named by the `node_id` query parameter.
    ///
    /// The node is fetched first; an unknown or malformed ID never reaches
    /// the store's delete.
    pub async fn delete(
        &self,
        identity: &AuthIdentity,
        node_id: Option<&str>,
    ) -> Result<NodeOutcome, NodeApiError> {
        let result = self.delete_inner(identity, node_id).await;
        audit(NodeOperation::Delete, identity, &result);
        result
    }

    async fn delete_inner(
        &self,
        identity: &AuthIdentity,
        node_id: Option<&str>,
    ) -> Result<NodeOutcome, NodeApiError> {
        self.authorize(identity).await?;

        let raw = node_id.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(NodeApiError::InvalidInput(MISSING_NODE_ID.to_string()));
        }
        let id = NodeId::from_str(raw).map_err(|_| NodeApiError::unknown_node())?;

        let node = match self.store.get(&id).await {
            Ok(Some(node)) => node,
            Ok(None) => return Err(NodeApiError::unknown_node()),
            Err(e) => {
                warn!(node_id = %id, error = %e, "node lookup before delete failed");
                return Err(NodeApiError::unknown_node());
            }
        };

        let deleted = self
            .store
            .delete(&node.id.unwrap_or(id))
            .await
            .map_err(store_failure)?;
        if deleted {
            Ok(NodeOutcome::Deleted)
        } else {
            Err(NodeApiError::unknown_node())
        }
    }

    /// Check the caller against the permission gate.
    pub async fn authorize(&self, identity: &AuthIdentity) -> Result<(), NodeApiError> {
        if self.gate.allowed(identity).await {
            Ok(())
        } else {
            Err(NodeApiError::forbidden())
        }
    }
}

impl<S: NodeStore + 'static, G: PermissionGate + 'static> Clone for NodeApi<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            gate: Arc::clone(&self.gate),
            pagination: self.pagination,
        }
    }
}

/// Decode a candidate node from a request body.
///
/// Empty, non-JSON, non-object bodies and bodies missing `name` or
/// `description` are rejected with a fixed message.
pub fn parse_node(body: &[u8]) -> Result<Node, NodeApiError> {
    Node::from_json(body).map_err(|e| {
        debug!(error = %e, "rejecting node body");
        NodeApiError::invalid_body()
    })
}

fn store_failure<E: std::error::Error>(e: E) -> NodeApiError {
    error!(error = %e, "node store call failed");
    NodeApiError::Internal(e.to_string())
}

fn audit(op: NodeOperation, identity: &AuthIdentity, result: &Result<NodeOutcome, NodeApiError>) {
    match result {
        Ok(outcome) => info!(
            target: "kg_nodes::audit",
            operation = op.as_str(),
            identity = %identity,
            status = outcome.status_code(),
            "node operation succeeded"
        ),
        Err(e) if e.is_client_error() => warn!(
            target: "kg_nodes::audit",
            operation = op.as_str(),
            identity = %identity,
            status = e.status_code(),
            error = %e,
            "node operation rejected"
        ),
        Err(e) => error!(
            target: "kg_nodes::audit",
            operation = op.as_str(),
            identity = %identity,
            status = e.status_code(),
            error = %e,
            "node operation failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAll, StaticPermissionGate};
    use crate::store::InMemoryNodeStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store double that counts calls and delegates to an in-memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryNodeStore,
        calls: AtomicUsize,
        deletes: AtomicUsize,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NodeStore for CountingStore {
        type Error = crate::store::memory::InMemoryError;

        async fn get(&self, id: &NodeId) -> Result<Option<Node>, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get(id).await
        }

        async fn create(&self, node: Node) -> Result<Node, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.create(node).await
        }

        async fn update(&self, node: Node) -> Result<Option<Node>, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.update(node).await
        }

        async fn delete(&self, id: &NodeId) -> Result<bool, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(id).await
        }

        async fn list(&self, options: &NodeGetOptions) -> Result<Vec<Node>, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list(options).await
        }
    }

    fn admin() -> AuthIdentity {
        AuthIdentity::new("admin")
    }

    fn api() -> NodeApi<CountingStore, StaticPermissionGate> {
        NodeApi::new(CountingStore::default(), StaticPermissionGate::new(["admin"]))
    }

    #[tokio::test]
    async fn test_create_returns_stored_node() {
        let api = api();
        let outcome = api
            .create(&admin(), br#"{"name":"Algebra","description":"Intro"}"#)
            .await
            .unwrap();

        let NodeOutcome::Created(node) = outcome else {
            panic!("expected Created");
        };
        assert!(node.id.is_some());
        assert_eq!(node.name, "Algebra");
        assert_eq!(node.description, "Intro");
        assert_eq!(api.store().inner.num_nodes(), 1);
    }

    #[tokio::test]
    async fn test_create_bad_body_is_invalid_input() {
        let api = api();
        let bodies: [&[u8]; 4] = [b"", b"{", b"null", br#"{"name":"only"}"#];
        for body in bodies {
            let err = api.create(&admin(), body).await.unwrap_err();
            assert_eq!(err, NodeApiError::invalid_body());
        }
        assert_eq!(api.store().calls(), 0);
    }

    #[tokio::test]
    async fn test_create_store_failure_uses_fixed_message() {
        let api = api();
        api.store().inner.set_available(false);
        let err = api
            .create(&admin(), br#"{"name":"Algebra","description":"Intro"}"#)
            .await
            .unwrap_err();
        assert_eq!(err, NodeApiError::Internal(CREATE_FAILED.to_string()));
    }

    #[tokio::test]
    async fn test_denied_caller_touches_nothing() {
        let api = api();
        let stranger = AuthIdentity::new("stranger");
        let id = api.store().inner.insert(Node::new("Algebra", "Intro")).to_string();

        // Malformed bodies must not surface as 400 before the gate runs.
        let results = [
            api.create(&stranger, b"").await,
            api.list(&stranger, &RawNodeQuery::default()).await,
            api.update(&stranger, b"not json").await,
            api.delete(&stranger, Some(id.as_str())).await,
            api.delete(&stranger, None).await,
        ];
        for result in results {
            assert_eq!(result.unwrap_err(), NodeApiError::forbidden());
        }
        assert_eq!(api.store().calls(), 0);
        assert_eq!(api.store().inner.num_nodes(), 1);
    }

    #[tokio::test]
    async fn test_list_malformed_page_is_unconstrained() {
        let api = api();
        for i in 0..3 {
            api.store().inner.insert(Node::new(format!("Topic {i}"), "d"));
        }
        let query = RawNodeQuery {
            page: Some("abc".to_string()),
            per_page: Some("1".to_string()),
            ..Default::default()
        };
        // page falls back to -1, treated as the first page
        let NodeOutcome::List(nodes) = api.list(&admin(), &query).await.unwrap() else {
            panic!("expected List");
        };
        assert_eq!(nodes.len(), 1);

        let query = RawNodeQuery {
            page: Some("abc".to_string()),
            ..Default::default()
        };
        let NodeOutcome::List(nodes) = api.list(&admin(), &query).await.unwrap() else {
            panic!("expected List");
        };
        assert_eq!(nodes.len(), 3);
    }

    #[tokio::test]
    async fn test_list_uses_configured_pagination() {
        let api = api().with_pagination(PaginationDefaults { page: 0, per_page: 2 });
        for i in 0..5 {
            api.store().inner.insert(Node::new(format!("Topic {i}"), "d"));
        }
        let NodeOutcome::List(nodes) = api.list(&admin(), &RawNodeQuery::default()).await.unwrap()
        else {
            panic!("expected List");
        };
        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_list_store_failure_is_internal() {
        let api = api();
        api.store().inner.set_available(false);
        let err = api.list(&admin(), &RawNodeQuery::default()).await.unwrap_err();
        assert_eq!(err, NodeApiError::Internal("node store unavailable".to_string()));
    }

    #[tokio::test]
    async fn test_update_empty_body_makes_no_store_call() {
        let api = api();
        let err = api.update(&admin(), b"").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(api.store().calls(), 0);
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let api = api();
        let err = api
            .update(&admin(), br#"{"name":"Algebra","description":"Intro"}"#)
            .await
            .unwrap_err();
        assert_eq!(err, NodeApiError::invalid_body());
        assert_eq!(api.store().calls(), 0);
    }

    #[tokio::test]
    async fn test_update_existing_and_unknown() {
        let api = api();
        let id = api.store().inner.insert(Node::new("Algebra", "Intro"));

        let body = format!(r#"{{"id":"{id}","name":"Algebra","description":"Advanced"}}"#);
        assert_eq!(api.update(&admin(), body.as_bytes()).await, Ok(NodeOutcome::Updated));
        let stored = api.store().inner.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.description, "Advanced");

        let body = format!(
            r#"{{"id":"{}","name":"Ghost","description":"x"}}"#,
            NodeId::generate()
        );
        assert_eq!(
            api.update(&admin(), body.as_bytes()).await,
            Err(NodeApiError::unknown_node())
        );
    }

    #[tokio::test]
    async fn test_delete_blank_id_makes_no_store_call() {
        let api = api();
        for node_id in [None, Some(""), Some("   "), Some("\t\n")] {
            let err = api.delete(&admin(), node_id).await.unwrap_err();
            assert_eq!(err, NodeApiError::InvalidInput(MISSING_NODE_ID.to_string()));
        }
        assert_eq!(api.store().calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_never_deletes() {
        let api = api();
        let unknown = NodeId::generate().to_string();
        let err = api.delete(&admin(), Some(unknown.as_str())).await.unwrap_err();
        assert_eq!(err, NodeApiError::unknown_node());
        assert_eq!(api.store().deletes.load(Ordering::SeqCst), 0);

        let err = api.delete(&admin(), Some("not-a-uuid")).await.unwrap_err();
        assert_eq!(err, NodeApiError::unknown_node());
        assert_eq!(api.store().calls(), 1);
    }

    #[tokio::test]
    async fn test_delete_existing() {
        let api = api();
        let id = api.store().inner.insert(Node::new("Algebra", "Intro"));
        let raw = format!(" {id} ");
        assert_eq!(api.delete(&admin(), Some(raw.as_str())).await, Ok(NodeOutcome::Deleted));
        assert_eq!(api.store().inner.num_nodes(), 0);
    }

    #[tokio::test]
    async fn test_allow_all_gate() {
        let api = NodeApi::new(InMemoryNodeStore::new(), AllowAll);
        let outcome = api
            .list(&AuthIdentity::new("anyone"), &RawNodeQuery::default())
            .await
            .unwrap();
        assert_eq!(outcome, NodeOutcome::List(Vec::new()));
        assert_eq!(outcome.message(), "");
    }
}
