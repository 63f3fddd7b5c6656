//! Caller identity and the node-management permission gate.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identifier of an authenticated caller.
///
/// Established upstream by the authentication layer and treated as opaque here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthIdentity(String);

impl AuthIdentity {
    /// Wrap an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides whether a caller may manage nodes.
///
/// Consulted once per request before any body parsing or store access.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Whether `identity` may create, list, update and delete nodes.
    async fn allowed(&self, identity: &AuthIdentity) -> bool;
}

/// Gate backed by a fixed set of manager identities.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissionGate {
    managers: BTreeSet<AuthIdentity>,
}

impl StaticPermissionGate {
    /// Create a gate that allows exactly `managers`.
    pub fn new<I, S>(managers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            managers: managers.into_iter().map(|m| AuthIdentity::new(m)).collect(),
        }
    }

    /// Parse a comma-separated manager list; blank entries are skipped.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(
            csv.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    }

    /// Number of manager identities.
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Whether no identity is allowed.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

#[async_trait]
impl PermissionGate for StaticPermissionGate {
    async fn allowed(&self, identity: &AuthIdentity) -> bool {
        self.managers.contains(identity)
    }
}

/// Gate that allows every authenticated caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PermissionGate for AllowAll {
    async fn allowed(&self, _identity: &AuthIdentity) -> bool {
        true
    }
}
