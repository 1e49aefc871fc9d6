//! PostgreSQL connection pool management.
//!
//! The pool is the only shared resource in the layer: repositories borrow
//! it and every operation checks a connection out for its duration.

use sqlx::Connection;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use super::analytics::PgAnalyticsRepository;
use super::author::PgAuthorRepository;
use super::helpers::store_error;
use super::issue::PgIssueRepository;
use super::project::PgProjectRepository;
use super::status_change::PgStatusChangeRepository;
use crate::config::{DbConfig, PoolSettings};
use crate::db::{Database, DbError, DbResult};

/// PostgreSQL database implementation.
///
/// Cloning is cheap and shares the underlying pool.
#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Connect with the default pool policy.
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        Self::connect_with(config, PoolSettings::default()).await
    }

    /// Open a pool and verify the server answers within `settings.ping_timeout`.
    ///
    /// If the liveness check fails the pool is closed before the error is
    /// returned.
    pub async fn connect_with(config: &DbConfig, settings: PoolSettings) -> DbResult<Self> {
        let options = config.connect_options()?;

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .idle_timeout(Some(settings.idle_timeout))
            .max_lifetime(Some(settings.max_lifetime))
            .acquire_timeout(settings.ping_timeout)
            .connect_lazy_with(options);

        let db = Self { pool };

        match tokio::time::timeout(settings.ping_timeout, db.ping()).await {
            Ok(Ok(())) => {
                info!(dsn = %config.redacted_dsn(), "Connected to PostgreSQL");
                Ok(db)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "PostgreSQL liveness check failed");
                db.close().await;
                Err(DbError::Connection {
                    message: format!("failed to ping database: {}", e),
                })
            }
            Err(_) => {
                warn!(timeout = ?settings.ping_timeout, "PostgreSQL liveness check timed out");
                db.close().await;
                Err(DbError::Connection {
                    message: format!(
                        "failed to ping database: timed out after {:?}",
                        settings.ping_timeout
                    ),
                })
            }
        }
    }

    /// Wrap an existing pool (e.g. one provided by a test harness).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    ///
    /// Useful for tests and operations that need direct database access.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out a connection and round-trip a ping.
    pub async fn ping(&self) -> DbResult<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| store_error("acquire connection", e))?;
        conn.ping().await.map_err(|e| store_error("ping", e))
    }

    /// Close every pooled connection. Calling this more than once is harmless.
    pub async fn close(&self) {
        if self.pool.is_closed() {
            return;
        }
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

impl Database for PostgresDatabase {
    type Projects<'a> = PgProjectRepository<'a>;
    type Authors<'a> = PgAuthorRepository<'a>;
    type Issues<'a> = PgIssueRepository<'a>;
    type StatusChanges<'a> = PgStatusChangeRepository<'a>;
    type Analytics<'a> = PgAnalyticsRepository<'a>;

    fn projects(&self) -> Self::Projects<'_> {
        PgProjectRepository { pool: &self.pool }
    }

    fn authors(&self) -> Self::Authors<'_> {
        PgAuthorRepository { pool: &self.pool }
    }

    fn issues(&self) -> Self::Issues<'_> {
        PgIssueRepository { pool: &self.pool }
    }

    fn status_changes(&self) -> Self::StatusChanges<'_> {
        PgStatusChangeRepository { pool: &self.pool }
    }

    fn analytics(&self) -> Self::Analytics<'_> {
        PgAnalyticsRepository { pool: &self.pool }
    }
}
