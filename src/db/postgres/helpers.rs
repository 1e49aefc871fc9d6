//! Shared helper functions for PostgreSQL repositories.
//!
//! Filters and pagination are always bound as parameters; only fixed
//! column names from the repositories are spliced into the SQL text.

use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::warn;

use crate::db::{DbError, PageSort};

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Wrap a driver error with the operation that produced it.
///
/// Failures to reach the server or get a pooled connection become
/// `Connection` errors so callers can retry them.
pub fn store_error(operation: &str, e: sqlx::Error) -> DbError {
    match &e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => DbError::Connection {
            message: format!("{}: {}", operation, e),
        },
        _ => DbError::Database {
            message: format!("{}: {}", operation, e),
        },
    }
}

/// Like [`store_error`], but a unique violation means the identity is taken.
pub fn insert_error(operation: &str, entity_type: &str, id: impl ToString, e: sqlx::Error) -> DbError {
    let is_duplicate = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);

    if is_duplicate {
        DbError::AlreadyExists {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    } else {
        store_error(operation, e)
    }
}

/// Roll back after a failed statement, logging (not returning) a rollback
/// failure so the original error reaches the caller.
pub async fn rollback(tx: Transaction<'_, Postgres>, operation: &str) {
    if let Err(e) = tx.rollback().await {
        warn!(operation, error = %e, "rollback failed");
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside LIKE.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Turn a search term into a substring pattern.
/// Returns None for empty/whitespace-only terms.
pub fn substring_pattern(search: Option<&str>) -> Option<String> {
    let term = search?.trim();
    if term.is_empty() {
        return None;
    }
    Some(format!("%{}%", escape_like(term)))
}

/// Append `WHERE <column> ILIKE $n` when a pattern is present.
pub fn push_ilike_filter(builder: &mut QueryBuilder<'_, Postgres>, column: &str, pattern: Option<String>) {
    if let Some(pattern) = pattern {
        builder.push(" WHERE ");
        builder.push(column);
        builder.push(" ILIKE ");
        builder.push_bind(pattern);
    }
}

/// Append `LIMIT $n OFFSET $m` using the page's effective values.
pub fn push_limit_offset(builder: &mut QueryBuilder<'_, Postgres>, page: &PageSort) {
    builder.push(" LIMIT ");
    builder.push_bind(page.effective_limit());
    builder.push(" OFFSET ");
    builder.push_bind(page.effective_offset());
}
