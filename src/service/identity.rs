//! Caller identity resolution.
//!
//! Token verification happens upstream. This layer only reads the identity
//! the authenticating gateway attached to the request, rejects requests
//! without one, and hands it to handlers through request extensions.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderName, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use crate::auth::AuthIdentity;
use crate::error::NodeApiError;
use super::response::envelope;

/// Reads the authenticated caller from request headers.
pub trait IdentitySource: Send + Sync + 'static {
    /// Identity of the caller, or `None` when the request is unauthenticated.
    fn identity(&self, headers: &HeaderMap) -> Option<AuthIdentity>;
}

/// Identity carried verbatim in a single header.
#[derive(Debug, Clone)]
pub struct HeaderIdentitySource {
    header: HeaderName,
}

impl HeaderIdentitySource {
    /// Read identities from `header`.
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }

    /// Parse the header name; invalid names fall back to the default header.
    pub fn from_name(name: &str) -> Self {
        let header = HeaderName::try_from(name).unwrap_or_else(|_| {
            warn!(header = name, "invalid identity header name, using default");
            HeaderName::from_static(crate::config::DEFAULT_IDENTITY_HEADER)
        });
        Self { header }
    }

    /// Header consulted for the identity.
    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl Default for HeaderIdentitySource {
    fn default() -> Self {
        Self::new(HeaderName::from_static(crate::config::DEFAULT_IDENTITY_HEADER))
    }
}

impl IdentitySource for HeaderIdentitySource {
    fn identity(&self, headers: &HeaderMap) -> Option<AuthIdentity> {
        headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(AuthIdentity::new)
    }
}

/// Middleware that rejects unauthenticated requests with 401 and stores the
/// caller identity in request extensions.
pub async fn require_identity(
    State(source): State<Arc<dyn IdentitySource>>,
    mut request: Request,
    next: Next,
) -> Response {
    match source.identity(request.headers()) {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => {
            warn!(path = %request.uri().path(), "rejecting unauthenticated request");
            envelope::<()>(StatusCode::UNAUTHORIZED, "authentication required", None)
        }
    }
}

/// Extractor for the identity stored by [`require_identity`].
///
/// A missing identity means the middleware was not installed, which is a
/// server fault.
#[derive(Debug, Clone)]
pub struct Caller(pub AuthIdentity);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = NodeApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthIdentity>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| {
                error!("caller identity missing from request context");
                NodeApiError::Internal("could not resolve caller identity".to_string())
            })
    }
}
