//! PostgreSQL implementation of the database traits.
//!
//! This module provides a sqlx-backed implementation of the repository
//! traits defined in the parent module, targeting the `raw` and
//! `analytics` schemas.

mod analytics;
mod author;
mod connection;
mod helpers;
mod issue;
mod project;
mod status_change;

#[cfg(test)]
mod analytics_test;
#[cfg(test)]
mod project_test;

pub use analytics::PgAnalyticsRepository;
pub use author::PgAuthorRepository;
pub use connection::PostgresDatabase;
pub use issue::PgIssueRepository;
pub use project::PgProjectRepository;
pub use status_change::PgStatusChangeRepository;
