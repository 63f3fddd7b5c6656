//! Node management REST service.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/nodes/` - List nodes (`term_in_name`, `term_in_description`, `page`, `per_page`)
//! - `POST /api/v1/nodes/` - Create a node
//! - `PUT /api/v1/nodes/` - Update a node
//! - `DELETE /api/v1/nodes/?node_id=...` - Delete a node
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod identity;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use identity::{require_identity, Caller, HeaderIdentitySource, IdentitySource};
pub use middleware::metrics_middleware;
pub use response::{envelope, Envelope};
pub use routes::create_router;
pub use state::ServiceState;
