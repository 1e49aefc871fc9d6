//! Domain models for the issue-tracker store.
//!
//! These models mirror the `raw` and `analytics` schemas and are shared by
//! every repository implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// =============================================================================
// Query Types for Pagination and Filtering
// =============================================================================

/// Page size used when a query does not ask for a positive limit.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Offset-based pagination options - composed into entity-specific queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSort {
    /// Maximum number of items to return. `None` or `<= 0` means the default.
    pub limit: Option<i64>,
    /// Number of items to skip. `None` or negative means zero.
    pub offset: Option<i64>,
}

impl PageSort {
    /// Limit actually applied to the query.
    pub fn effective_limit(&self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_PAGE_LIMIT,
        }
    }

    /// Offset actually applied to the query.
    pub fn effective_offset(&self) -> i64 {
        self.offset.filter(|o| *o > 0).unwrap_or(0)
    }
}

/// Query for Authors - pagination + case-insensitive name search.
#[derive(Debug, Clone, Default)]
pub struct AuthorQuery {
    pub page: PageSort,
    /// Substring matched case-insensitively against the author name.
    pub search: Option<String>,
}

/// Result of a paginated list query.
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Total count of all matching items (before pagination).
    pub total: usize,
    /// Limit that was applied.
    pub limit: i64,
    /// Offset that was applied.
    pub offset: i64,
}

// =============================================================================
// Raw entities
// =============================================================================

/// Caller-assigned integer identity used by every raw entity.
pub type Id = i32;

/// A tracked project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Id,
    pub title: String,
}

/// A person who reports, is assigned to, or changes issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Author {
    pub id: Id,
    pub name: String,
}

/// An issue imported from the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
pub struct Issue {
    pub id: Id,
    pub project_id: Id,
    pub author_id: Id,
    pub assignee_id: Option<Id>,
    pub key: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub closed_time: Option<DateTime<Utc>>,
    pub updated_time: Option<DateTime<Utc>>,
    /// Logged work in seconds.
    pub time_spent: Option<i32>,
}

/// Statuses that count an issue as closed. Anything else, including no
/// status at all, is open.
pub const CLOSED_STATUSES: &[&str] = &["Closed", "Resolved"];

impl Issue {
    /// Whether the issue is in one of the [`CLOSED_STATUSES`].
    pub fn is_closed(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| CLOSED_STATUSES.contains(&s))
    }
}

/// One transition in an issue's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StatusChange {
    pub issue_id: Id,
    pub author_id: Id,
    pub change_time: DateTime<Utc>,
    pub from_status: String,
    pub to_status: String,
}

// =============================================================================
// Analytics
// =============================================================================

/// The five precomputed analytics stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsKind {
    OpenTaskTime,
    TaskStateTime,
    ComplexityTaskTime,
    TaskPriorityCount,
    ActivityByTask,
}

impl AnalyticsKind {
    pub const ALL: [AnalyticsKind; 5] = [
        AnalyticsKind::OpenTaskTime,
        AnalyticsKind::TaskStateTime,
        AnalyticsKind::ComplexityTaskTime,
        AnalyticsKind::TaskPriorityCount,
        AnalyticsKind::ActivityByTask,
    ];

    /// Schema-qualified table holding this kind.
    pub fn table(self) -> &'static str {
        match self {
            AnalyticsKind::OpenTaskTime => "analytics.open_task_time",
            AnalyticsKind::TaskStateTime => "analytics.task_state_time",
            AnalyticsKind::ComplexityTaskTime => "analytics.complexity_task_time",
            AnalyticsKind::TaskPriorityCount => "analytics.task_priority_count",
            AnalyticsKind::ActivityByTask => "analytics.activity_by_task",
        }
    }

    /// Whether records of this kind are keyed by a state as well as a project.
    pub fn has_state(self) -> bool {
        matches!(
            self,
            AnalyticsKind::TaskStateTime
                | AnalyticsKind::TaskPriorityCount
                | AnalyticsKind::ActivityByTask
        )
    }
}

impl std::fmt::Display for AnalyticsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalyticsKind::OpenTaskTime => "open_task_time",
            AnalyticsKind::TaskStateTime => "task_state_time",
            AnalyticsKind::ComplexityTaskTime => "complexity_task_time",
            AnalyticsKind::TaskPriorityCount => "task_priority_count",
            AnalyticsKind::ActivityByTask => "activity_by_task",
        };
        write!(f, "{}", s)
    }
}

/// A stored analytics payload.
///
/// `data` is opaque: it is returned exactly as it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AnalyticsRecord {
    #[sqlx(rename = "id_project")]
    pub project_id: Id,
    pub creation_time: DateTime<Utc>,
    /// Always `None` for kinds without a state column.
    pub state: Option<String>,
    pub data: serde_json::Value,
}
