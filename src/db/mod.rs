//! Database abstraction layer over the issue-tracker store.
//!
//! This module provides trait-based abstractions for data access,
//! keeping callers independent of the concrete PostgreSQL backend.
//!
//! # Architecture
//!
//! - `error`: Storage-agnostic error types
//! - `models`: Domain entities (Project, Author, Issue, StatusChange, AnalyticsRecord)
//! - `repository`: Trait definitions for data access
//! - `postgres`: sqlx-backed implementation of the traits

mod error;
mod models;
pub mod postgres;
mod repository;


pub use error::{DbError, DbResult};
pub use models::*;
pub use postgres::PostgresDatabase;
pub use repository::*;
