//! Service state management.

use std::sync::Arc;

use crate::auth::{PermissionGate, StaticPermissionGate};
use crate::config::{ServiceConfig, DEFAULT_BODY_LIMIT};
use crate::orchestrator::NodeApi;
use crate::store::NodeStore;

use super::identity::{HeaderIdentitySource, IdentitySource};

/// Shared service state.
///
/// Holds the node orchestrator, the identity source used by the
/// authentication middleware and the request body limit.
pub struct ServiceState<S: NodeStore + 'static, G: PermissionGate + 'static> {
    /// Permission-gated node operations.
    pub api: NodeApi<S, G>,
    identity: Arc<dyn IdentitySource>,
    body_limit: usize,
}

impl<S: NodeStore + 'static, G: PermissionGate + 'static> ServiceState<S, G> {
    /// Create state that reads identities from the default header.
    pub fn new(api: NodeApi<S, G>) -> Self {
        Self {
            api,
            identity: Arc::new(HeaderIdentitySource::default()),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Replace the identity source.
    pub fn with_identity_source(mut self, source: impl IdentitySource) -> Self {
        self.identity = Arc::new(source);
        self
    }

    /// Replace the request body limit.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Identity source for the authentication middleware.
    pub fn identity_source(&self) -> Arc<dyn IdentitySource> {
        Arc::clone(&self.identity)
    }

    /// Request body limit in bytes.
    pub fn body_limit(&self) -> usize {
        self.body_limit
    }
}

impl<S: NodeStore + 'static> ServiceState<S, StaticPermissionGate> {
    /// Build state from configuration: manager list, pagination sentinels,
    /// identity header and body limit.
    pub fn from_config(store: S, config: &ServiceConfig) -> Self {
        let api = NodeApi::new(store, config.permission_gate())
            .with_pagination(config.pagination);
        Self::new(api)
            .with_identity_source(HeaderIdentitySource::from_name(&config.identity_header))
            .with_body_limit(config.max_body_bytes)
    }
}

impl<S: NodeStore + 'static, G: PermissionGate + 'static> Clone for ServiceState<S, G> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            identity: Arc::clone(&self.identity),
            body_limit: self.body_limit,
        }
    }
}
