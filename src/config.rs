//! Service configuration loaded from environment variables.
//!
//! - `HOST`: bind host (default: 0.0.0.0)
//! - `PORT`: bind port (default: 8080)
//! - `NODES_DEFAULT_PAGE`: page used when `page` is absent or malformed (default: -1)
//! - `NODES_DEFAULT_PER_PAGE`: page size used when `per_page` is absent or malformed (default: -1)
//! - `NODE_MANAGERS`: comma-separated identities allowed to manage nodes
//! - `IDENTITY_HEADER`: header carrying the authenticated identity (default: x-auth-identity)
//! - `MAX_BODY_BYTES`: request body limit (default: 1 MiB)

use std::net::SocketAddr;

use tracing::warn;

use crate::auth::StaticPermissionGate;
use crate::types::PaginationDefaults;

/// Default identity header set by the authenticating gateway.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-auth-identity";

/// Default request body size limit (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// HOST/PORT do not form a socket address.
    #[error("invalid bind address {0}: {1}")]
    InvalidAddress(String, std::net::AddrParseError),
}

/// Runtime configuration of the node service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Pagination sentinels for listing.
    pub pagination: PaginationDefaults,
    /// Identities allowed to manage nodes.
    pub node_managers: Vec<String>,
    /// Header carrying the caller identity.
    pub identity_header: String,
    /// Request body limit in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            pagination: PaginationDefaults::default(),
            node_managers: Vec::new(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            max_body_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Malformed numeric values keep their defaults and log a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let node_managers: Vec<String> = lookup("NODE_MANAGERS")
            .map(|csv| {
                csv.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if node_managers.is_empty() {
            warn!("NODE_MANAGERS not set; every node operation will be forbidden");
        }

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port),
            pagination: PaginationDefaults {
                page: parse_var(&lookup, "NODES_DEFAULT_PAGE", defaults.pagination.page),
                per_page: parse_var(
                    &lookup,
                    "NODES_DEFAULT_PER_PAGE",
                    defaults.pagination.per_page,
                ),
            },
            node_managers,
            identity_header: lookup("IDENTITY_HEADER")
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .unwrap_or(defaults.identity_header),
            max_body_bytes: parse_var(&lookup, "MAX_BODY_BYTES", defaults.max_body_bytes),
        }
    }

    /// Socket address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse()
            .map_err(|e| ConfigError::InvalidAddress(raw, e))
    }

    /// Permission gate built from the manager list.
    pub fn permission_gate(&self) -> StaticPermissionGate {
        StaticPermissionGate::new(self.node_managers.iter().cloned())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = key, value = %raw, "ignoring malformed configuration value");
            default
        }),
        None => default,
    }
}
