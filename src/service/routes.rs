//! Axum routes for the node service.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Json, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::{AuthIdentity, PermissionGate};
use crate::orchestrator::NodeApi;
use crate::store::NodeStore;
use crate::types::RawNodeQuery;

use super::identity::{require_identity, Caller};
use super::middleware::metrics_middleware;
use super::response::envelope;
use super::state::ServiceState;

type SharedState<S, G> = Arc<ServiceState<S, G>>;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Decoded query string as ordered key/value pairs.
///
/// Repeated keys are kept rather than rejected, so extraction never fails
/// ahead of the permission check.
type QueryPairs = Query<Vec<(String, String)>>;

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store_healthy: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub store: bool,
    pub details: Option<String>,
}

// ============================================================================
// Node Handlers
// ============================================================================

/// `GET /nodes/`: list nodes with optional filters and pagination.
async fn list_nodes<S: NodeStore + 'static, G: PermissionGate + 'static>(
    State(state): State<SharedState<S, G>>,
    Caller(identity): Caller,
    Query(pairs): QueryPairs,
) -> Response {
    let query = RawNodeQuery::from_pairs(pairs);
    state.api.list(&identity, &query).await.into_response()
}

/// `POST /nodes/`: create a node.
///
/// The body is taken as raw bytes so that it is decoded only after the
/// permission check.
async fn create_node<S: NodeStore + 'static, G: PermissionGate + 'static>(
    State(state): State<SharedState<S, G>>,
    Caller(identity): Caller,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match body {
        Ok(body) => state.api.create(&identity, &body).await.into_response(),
        Err(rejection) => unreadable_body(&state.api, &identity, rejection).await,
    }
}

/// `PUT /nodes/`: update a node identified by the `id` in its body.
async fn update_node<S: NodeStore + 'static, G: PermissionGate + 'static>(
    State(state): State<SharedState<S, G>>,
    Caller(identity): Caller,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match body {
        Ok(body) => state.api.update(&identity, &body).await.into_response(),
        Err(rejection) => unreadable_body(&state.api, &identity, rejection).await,
    }
}

/// `DELETE /nodes/?node_id=...`: delete a node. The first `node_id` wins.
async fn delete_node<S: NodeStore + 'static, G: PermissionGate + 'static>(
    State(state): State<SharedState<S, G>>,
    Caller(identity): Caller,
    Query(pairs): QueryPairs,
) -> Response {
    let node_id = pairs
        .into_iter()
        .find_map(|(key, value)| (key == "node_id").then_some(value));
    state.api.delete(&identity, node_id.as_deref()).await.into_response()
}

/// Body that could not be buffered (e.g. over the size limit).
///
/// Denied callers still get 403; everyone else gets the rejection's status
/// in the standard envelope.
async fn unreadable_body<S: NodeStore + 'static, G: PermissionGate + 'static>(
    api: &NodeApi<S, G>,
    identity: &AuthIdentity,
    rejection: BytesRejection,
) -> Response {
    if let Err(e) = api.authorize(identity).await {
        return e.into_response();
    }
    warn!(status = %rejection.status(), "rejecting unreadable request body");
    envelope::<()>(rejection.status(), rejection.body_text(), None)
}

// ============================================================================
// Health Handlers
// ============================================================================

/// Health check endpoint (detailed).
async fn health_handler<S: NodeStore + 'static, G: PermissionGate + 'static>(
    State(state): State<SharedState<S, G>>,
) -> Json<HealthResponse> {
    let store_healthy = state.api.store().is_healthy().await;
    Json(HealthResponse {
        status: if store_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_healthy,
    })
}

/// Liveness probe endpoint. Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the store is reachable, 503 otherwise.
async fn readiness_handler<S: NodeStore + 'static, G: PermissionGate + 'static>(
    State(state): State<SharedState<S, G>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.api.store().is_healthy().await {
        Ok(Json(ReadinessResponse {
            ready: true,
            store: true,
            details: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                store: false,
                details: Some("Node store unavailable".to_string()),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the node service.
///
/// Node routes live under `/api/v1/nodes` (with and without the trailing
/// slash) and require an authenticated caller. Health probes are public.
pub fn create_router<S: NodeStore + 'static, G: PermissionGate + 'static>(
    state: ServiceState<S, G>,
) -> Router {
    let identity = state.identity_source();
    let body_limit = state.body_limit();
    let state = Arc::new(state);

    let node_routes = get(list_nodes::<S, G>)
        .post(create_node::<S, G>)
        .put(update_node::<S, G>)
        .delete(delete_node::<S, G>);

    let api = Router::new()
        .route("/nodes/", node_routes.clone())
        .route("/nodes", node_routes)
        .route_layer(middleware::from_fn_with_state(identity, require_identity));

    Router::new()
        .nest("/api/v1", api)
        // Health checks
        .route("/health", get(health_handler::<S, G>))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler::<S, G>))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(metrics_middleware))
}
