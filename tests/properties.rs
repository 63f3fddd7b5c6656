//! Property tests for option composition and the permission gate.

use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use kg_nodes::store::memory::InMemoryError;
use kg_nodes::{
    AuthIdentity, InMemoryNodeStore, Node, NodeApi, NodeApiError, NodeGetOptions, NodeId,
    NodeStore, PaginationDefaults, RawNodeQuery, StaticPermissionGate,
};

/// Store double that counts every call.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryNodeStore,
    calls: AtomicUsize,
}

#[async_trait]
impl NodeStore for CountingStore {
    type Error = InMemoryError;

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
        self.inner.delete(id).await
    }

    async fn list(&self, options: &NodeGetOptions) -> Result<Vec<Node>, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list(options).await
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn non_integer() -> impl Strategy<Value = String> {
    "[^0-9+-]*[a-zA-Z .][^0-9]*"
}

proptest! {
    #[test]
    fn malformed_pagination_uses_sentinel(page in non_integer(), per_page in non_integer()) {
        let defaults = PaginationDefaults::default();
        let query = RawNodeQuery {
            page: Some(page),
            per_page: Some(per_page),
            ..Default::default()
        };
        let options = query.compose(defaults);
        prop_assert_eq!(options.page, defaults.page);
        prop_assert_eq!(options.per_page, defaults.per_page);
        prop_assert_eq!(options.limit_offset(), None);
    }

    #[test]
    fn well_formed_pagination_is_kept(page in any::<i64>(), per_page in any::<i64>()) {
        let query = RawNodeQuery {
            page: Some(page.to_string()),
            per_page: Some(per_page.to_string()),
            ..Default::default()
        };
        let options = query.compose(PaginationDefaults::default());
        prop_assert_eq!(options.page, page);
        prop_assert_eq!(options.per_page, per_page);
    }

    #[test]
    fn builder_order_does_not_matter(
        name in ".*",
        description in ".*",
        page in any::<i64>(),
        per_page in any::<i64>(),
    ) {
        let forward = NodeGetOptions::default()
            .with_term_in_name(name.clone())
            .with_page(page)
            .with_term_in_description(description.clone())
            .with_per_page(per_page);
        let backward = NodeGetOptions::default()
            .with_per_page(per_page)
            .with_term_in_description(description.clone())
            .with_page(page)
            .with_term_in_name(name.clone());
        let twice = forward.clone().with_term_in_name(name).with_page(page);

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward, twice);
    }

    #[test]
    fn denied_callers_never_reach_the_store(
        caller in "[a-z]{1,12}",
        body in ".*",
        node_id in proptest::option::of(".*"),
    ) {
        prop_assume!(caller != "admin");
        let rt = runtime();
        let api = NodeApi::new(CountingStore::default(), StaticPermissionGate::new(["admin"]));
        let identity = AuthIdentity::new(caller);

        let results = rt.block_on(async {
            vec![
                api.create(&identity, body.as_bytes()).await,
                api.list(&identity, &RawNodeQuery::default()).await,
                api.update(&identity, body.as_bytes()).await,
                api.delete(&identity, node_id.as_deref()).await,
            ]
        });

        for result in results {
            prop_assert_eq!(result, Err(NodeApiError::forbidden()));
        }
        prop_assert_eq!(api.store().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blank_node_id_never_reaches_the_store(node_id in "[ \t\r\n]*") {
        let rt = runtime();
        let api = NodeApi::new(CountingStore::default(), StaticPermissionGate::new(["admin"]));
        let result = rt.block_on(api.delete(&AuthIdentity::new("admin"), Some(node_id.as_str())));

        prop_assert_eq!(result.map_err(|e| e.status_code()), Err(400));
        prop_assert_eq!(api.store().calls.load(Ordering::SeqCst), 0);
    }
}
