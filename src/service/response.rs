//! Response envelope shared by every node endpoint.
//!
//! ```json
//! {"status_code": 201, "message": "Node created", "data": {...}}
//! ```
//!
//! `data` is omitted on errors and on operations without a payload.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::NodeApiError;
use crate::orchestrator::NodeOutcome;

/// JSON envelope `{status_code, message, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// HTTP status code, repeated in the body.
    pub status_code: u16,
    /// Human-readable message; may be empty.
    pub message: String,
    /// Payload, when the operation has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Render an envelope with the given status.
pub fn envelope<T: Serialize>(
    status: StatusCode,
    message: impl Into<String>,
    data: Option<T>,
) -> Response {
    let body = Envelope {
        status_code: status.as_u16(),
        message: message.into(),
        data,
    };
    (status, Json(body)).into_response()
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for NodeOutcome {
    fn into_response(self) -> Response {
        let status = status_from(self.status_code());
        let message = self.message();
        match self {
            NodeOutcome::Created(node) => envelope(status, message, Some(node)),
            NodeOutcome::List(nodes) => envelope(status, message, Some(nodes)),
            NodeOutcome::Updated | NodeOutcome::Deleted => envelope::<()>(status, message, None),
        }
    }
}

impl IntoResponse for NodeApiError {
    fn into_response(self) -> Response {
        envelope::<()>(status_from(self.status_code()), self.message(), None)
    }
}
