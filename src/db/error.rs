//! Database error types.
//!
//! This module provides abstracted error types for database operations.
//! It uses miette for fancy diagnostic output and thiserror for derive macros.
//! The error types are storage-backend agnostic.

use miette::Diagnostic;
use thiserror::Error;

/// Database operation errors.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Entity not found: {entity_type} with id '{id}'")]
    #[diagnostic(code(tracker_store::db::not_found))]
    NotFound { entity_type: String, id: String },

    #[error("Entity already exists: {entity_type} with id '{id}'")]
    #[diagnostic(code(tracker_store::db::already_exists))]
    AlreadyExists { entity_type: String, id: String },

    #[error("Validation error: {message}")]
    #[diagnostic(code(tracker_store::db::validation_error))]
    Validation { message: String },

    #[error("Database error: {message}")]
    #[diagnostic(code(tracker_store::db::database_error))]
    Database { message: String },

    #[error("Connection error: {message}")]
    #[diagnostic(
        code(tracker_store::db::connection_error),
        help("Check DB_HOST, DB_PORT and the credentials, and that PostgreSQL is reachable.")
    )]
    Connection { message: String },

    #[error("Serialization error: {message}")]
    #[diagnostic(code(tracker_store::db::serialization_error))]
    Serialization { message: String },
}

impl DbError {
    pub(crate) fn not_found(entity_type: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DbError::Validation {
            message: message.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Only connectivity failures (lost connection, pool timeout, failed
    /// liveness check) are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Connection { .. })
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
