//! PostgreSQL node store for production use.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::types::{Node, NodeGetOptions, NodeId, NodeType};
use super::NodeStore;

/// DDL for the nodes table.
pub const NODES_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id          UUID PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    node_type   TEXT NOT NULL DEFAULT 'lecture',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const NODE_COLUMNS: &str = "id, name, description, node_type, created_at, updated_at";

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/knowledge_graph".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// PostgreSQL node store.
pub struct PostgresNodeStore {
    pool: PgPool,
}

impl PostgresNodeStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Create the nodes table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), PostgresError> {
        sqlx::query(NODES_TABLE_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    /// Parse a node from a database row.
    fn parse_node_row(row: &PgRow) -> Result<Node, sqlx::Error> {
        let id: Uuid = row.try_get("id")?;
        let node_type: String = row.try_get("node_type")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Node {
            id: Some(NodeId::new(id)),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            node_type: NodeType::from_str(&node_type).unwrap_or_default(),
            created_at: Some(created_at),
            updated_at: Some(updated_at),
        })
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
impl NodeStore for PostgresNodeStore {
    type Error = PostgresError;

    async fn get(&self, id: &NodeId) -> Result<Option<Node>, Self::Error> {
        let row = sqlx::query(&format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(Self::parse_node_row(r)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, node: Node) -> Result<Node, Self::Error> {
        let row = sqlx::query(&format!(
            "INSERT INTO nodes (id, name, description, node_type, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, now(), now()) \
             RETURNING {NODE_COLUMNS}"
        ))
        .bind(NodeId::generate().as_uuid())
        .bind(&node.name)
        .bind(&node.description)
        .bind(node.node_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::parse_node_row(&row)?)
    }

    async fn update(&self, node: Node) -> Result<Option<Node>, Self::Error> {
        let Some(id) = node.id else {
            return Ok(None);
        };
        let row = sqlx::query(&format!(
            "UPDATE nodes SET name = $2, description = $3, node_type = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING {NODE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&node.name)
        .bind(&node.description)
        .bind(node.node_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(Self::parse_node_row(r)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &NodeId) -> Result<bool, Self::Error> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, options: &NodeGetOptions) -> Result<Vec<Node>, Self::Error> {
        let mut query: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {NODE_COLUMNS} FROM nodes WHERE TRUE"));

        if !options.term_in_name.is_empty() {
            query
                .push(" AND strpos(lower(name), lower(")
                .push_bind(options.term_in_name.as_str())
                .push(")) > 0");
        }
        if !options.term_in_description.is_empty() {
            query
                .push(" AND strpos(lower(description), lower(")
                .push_bind(options.term_in_description.as_str())
                .push(")) > 0");
        }
        query.push(" ORDER BY name, id");
        if let Some((limit, offset)) = options.limit_offset() {
            query
                .push(" LIMIT ")
                .push_bind(limit)
                .push(" OFFSET ")
                .push_bind(offset);
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(Self::parse_node_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(PostgresError::from)
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
