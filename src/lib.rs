//! Data-access layer for issue-tracker data stored in PostgreSQL.
//!
//! - [`config`]: connection settings read from `DB_*` environment variables
//! - [`db`]: domain models, repository traits and the PostgreSQL backend

pub mod config;
pub mod db;
