//! Error outcomes of node operations.

/// Message returned when a request body cannot be decoded into a node.
pub const INVALID_NODE_BODY: &str = "Invalid or missing `node` in the request body";

/// Message returned when the permission gate denies an operation.
pub const NO_PERMISSION: &str = "No permission for this action";

/// Message returned when a referenced node does not exist.
pub const UNKNOWN_NODE: &str = "unknown node";

/// Failure of a node operation.
///
/// Client errors carry fixed messages; server errors carry the underlying
/// error text unless a fixed message was substituted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeApiError {
    /// Malformed or missing input (400).
    #[error("{0}")]
    InvalidInput(String),
    /// Caller may not manage nodes (403).
    #[error("{0}")]
    Forbidden(String),
    /// Identity resolution or store failure (500).
    #[error("{0}")]
    Internal(String),
}

impl NodeApiError {
    /// Body could not be decoded into a node.
    pub fn invalid_body() -> Self {
        Self::InvalidInput(INVALID_NODE_BODY.to_string())
    }

    /// Permission gate denied the caller.
    pub fn forbidden() -> Self {
        Self::Forbidden(NO_PERMISSION.to_string())
    }

    /// Referenced node does not exist.
    pub fn unknown_node() -> Self {
        Self::InvalidInput(UNKNOWN_NODE.to_string())
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Forbidden(_) => 403,
            Self::Internal(_) => 500,
        }
    }

    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Forbidden(_) => "forbidden",
            Self::Internal(_) => "internal",
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(msg) | Self::Forbidden(msg) | Self::Internal(msg) => msg,
        }
    }

    /// Whether the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
