//! Repository traits for data access abstraction.
//!
//! These traits define the contract for data access, allowing different
//! storage backends to be swapped without changing business logic.
//!
//! Lookups return `Ok(None)` when nothing matches. Mutations whose target
//! does not exist fail with [`DbError::NotFound`](crate::db::DbError).

use serde::Serialize;

use crate::db::{
    DbError, DbResult,
    models::{
        AnalyticsKind, AnalyticsRecord, Author, AuthorQuery, Id, Issue, ListResult, Project,
        StatusChange,
    },
};

/// Repository for Project operations.
pub trait ProjectRepository {
    /// Insert a new project. Fails with `AlreadyExists` on a duplicate id.
    async fn create(&self, project: &Project) -> DbResult<()>;

    /// Get a project by ID.
    async fn get(&self, id: Id) -> DbResult<Option<Project>>;

    /// Get all projects ordered by id.
    async fn list(&self) -> DbResult<Vec<Project>>;

    /// Update an existing project.
    async fn update(&self, project: &Project) -> DbResult<()>;

    /// Insert the project or overwrite the stored title.
    async fn upsert(&self, project: &Project) -> DbResult<()>;

    /// Delete a project by ID.
    async fn delete(&self, id: Id) -> DbResult<()>;

    /// Number of stored projects.
    async fn count(&self) -> DbResult<i64>;
}

/// Repository for Author operations.
pub trait AuthorRepository {
    /// Insert a new author. Fails with `AlreadyExists` on a duplicate id.
    async fn create(&self, author: &Author) -> DbResult<()>;

    /// Get an author by ID.
    async fn get(&self, id: Id) -> DbResult<Option<Author>>;

    /// Get an author by exact name. Returns an arbitrary match if several exist.
    async fn get_by_name(&self, name: &str) -> DbResult<Option<Author>>;

    /// List authors ordered by name.
    async fn list(&self, query: Option<&AuthorQuery>) -> DbResult<ListResult<Author>>;

    /// Update an existing author.
    async fn update(&self, author: &Author) -> DbResult<()>;

    /// Insert the author or overwrite the stored name.
    async fn upsert(&self, author: &Author) -> DbResult<()>;

    /// Upsert and return the row as stored.
    async fn get_or_create(&self, id: Id, name: &str) -> DbResult<Author>;

    /// Delete an author by ID.
    async fn delete(&self, id: Id) -> DbResult<()>;

    /// Number of stored authors.
    async fn count(&self) -> DbResult<i64>;
}

/// Repository for Issue operations.
pub trait IssueRepository {
    /// Insert a new issue. Fails with `AlreadyExists` on a duplicate id.
    async fn create(&self, issue: &Issue) -> DbResult<()>;

    /// Get an issue by ID.
    async fn get(&self, id: Id) -> DbResult<Option<Issue>>;

    /// Get all issues ordered by id.
    async fn list(&self) -> DbResult<Vec<Issue>>;

    /// Issues of a project, most recently created first.
    async fn get_by_project_id(&self, project_id: Id) -> DbResult<Vec<Issue>>;

    /// Update every field of an existing issue.
    async fn update(&self, issue: &Issue) -> DbResult<()>;

    /// Insert the issue or overwrite every stored field.
    async fn upsert(&self, issue: &Issue) -> DbResult<()>;

    /// Delete an issue by ID.
    async fn delete(&self, id: Id) -> DbResult<()>;

    /// Number of stored issues.
    async fn count(&self) -> DbResult<i64>;

    /// Number of issues in a project.
    async fn count_by_project(&self, project_id: Id) -> DbResult<i64>;

    /// Issues whose status is not Closed/Resolved, NULL status included.
    async fn get_open_count_by_project(&self, project_id: Id) -> DbResult<i64>;

    /// Issues whose status is Closed or Resolved.
    async fn get_closed_count_by_project(&self, project_id: Id) -> DbResult<i64>;

    /// Mean hours from creation to closing over issues with both timestamps.
    ///
    /// `None` when no issue of the project qualifies.
    async fn get_average_time_by_project(&self, project_id: Id) -> DbResult<Option<f64>>;
}

/// Repository for the append-only status change log.
pub trait StatusChangeRepository {
    /// Append one status change.
    async fn create(&self, change: &StatusChange) -> DbResult<()>;

    /// History of an issue in chronological order.
    async fn get_by_issue_id(&self, issue_id: Id) -> DbResult<Vec<StatusChange>>;

    /// History of every issue in a project in chronological order.
    async fn get_by_project_id(&self, project_id: Id) -> DbResult<Vec<StatusChange>>;

    /// Insert all changes in one transaction. Empty input is a no-op.
    async fn bulk_insert(&self, changes: &[StatusChange]) -> DbResult<()>;

    /// Delete the history of an issue, returning the number of rows removed.
    async fn delete_by_issue_id(&self, issue_id: Id) -> DbResult<u64>;
}

/// Repository for the precomputed analytics payloads.
///
/// Payloads are serialized to JSON and stored unchanged. Records are
/// stamped with the server clock when written and returned newest first.
pub trait AnalyticsRepository {
    /// Append a payload of the given kind.
    ///
    /// `state` must be given exactly for the kinds that carry one.
    async fn save<T>(
        &self,
        kind: AnalyticsKind,
        project_id: Id,
        state: Option<&str>,
        data: &T,
    ) -> DbResult<()>
    where
        T: Serialize + Sync + ?Sized;

    /// Records of the given kind for a project (and state), newest first.
    async fn get(
        &self,
        kind: AnalyticsKind,
        project_id: Id,
        state: Option<&str>,
    ) -> DbResult<Vec<AnalyticsRecord>>;

    /// Remove the project's rows from every analytics table atomically,
    /// returning the total number of rows removed.
    async fn delete_all_by_project(&self, project_id: Id) -> DbResult<u64>;

    async fn save_open_task_time<T>(&self, project_id: Id, data: &T) -> DbResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.save(AnalyticsKind::OpenTaskTime, project_id, None, data)
            .await
    }

    async fn get_open_task_time(&self, project_id: Id) -> DbResult<Vec<AnalyticsRecord>> {
        self.get(AnalyticsKind::OpenTaskTime, project_id, None).await
    }

    async fn save_task_state_time<T>(&self, project_id: Id, state: &str, data: &T) -> DbResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.save(AnalyticsKind::TaskStateTime, project_id, Some(state), data)
            .await
    }

    async fn get_task_state_time(
        &self,
        project_id: Id,
        state: &str,
    ) -> DbResult<Vec<AnalyticsRecord>> {
        self.get(AnalyticsKind::TaskStateTime, project_id, Some(state))
            .await
    }

    async fn save_complexity_task_time<T>(&self, project_id: Id, data: &T) -> DbResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.save(AnalyticsKind::ComplexityTaskTime, project_id, None, data)
            .await
    }

    async fn get_complexity_task_time(&self, project_id: Id) -> DbResult<Vec<AnalyticsRecord>> {
        self.get(AnalyticsKind::ComplexityTaskTime, project_id, None)
            .await
    }

    async fn save_task_priority_count<T>(
        &self,
        project_id: Id,
        state: &str,
        data: &T,
    ) -> DbResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.save(AnalyticsKind::TaskPriorityCount, project_id, Some(state), data)
            .await
    }

    async fn get_task_priority_count(
        &self,
        project_id: Id,
        state: &str,
    ) -> DbResult<Vec<AnalyticsRecord>> {
        self.get(AnalyticsKind::TaskPriorityCount, project_id, Some(state))
            .await
    }

    async fn save_activity_by_task<T>(&self, project_id: Id, state: &str, data: &T) -> DbResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.save(AnalyticsKind::ActivityByTask, project_id, Some(state), data)
            .await
    }

    async fn get_activity_by_task(
        &self,
        project_id: Id,
        state: &str,
    ) -> DbResult<Vec<AnalyticsRecord>> {
        self.get(AnalyticsKind::ActivityByTask, project_id, Some(state))
            .await
    }
}

/// Check that `state` is present exactly when `kind` is keyed by one.
pub fn check_analytics_state(kind: AnalyticsKind, state: Option<&str>) -> DbResult<()> {
    match (kind.has_state(), state) {
        (true, None) => Err(DbError::validation(format!("{kind} requires a state"))),
        (false, Some(_)) => Err(DbError::validation(format!("{kind} has no state column"))),
        _ => Ok(()),
    }
}

/// Combined database interface.
///
/// Provides access to repositories via associated types, avoiding dynamic dispatch.
pub trait Database: Send + Sync {
    type Projects<'a>: ProjectRepository
    where
        Self: 'a;
    type Authors<'a>: AuthorRepository
    where
        Self: 'a;
    type Issues<'a>: IssueRepository
    where
        Self: 'a;
    type StatusChanges<'a>: StatusChangeRepository
    where
        Self: 'a;
    type Analytics<'a>: AnalyticsRepository
    where
        Self: 'a;

    /// Get the project repository.
    fn projects(&self) -> Self::Projects<'_>;

    /// Get the author repository.
    fn authors(&self) -> Self::Authors<'_>;

    /// Get the issue repository.
    fn issues(&self) -> Self::Issues<'_>;

    /// Get the status change repository.
    fn status_changes(&self) -> Self::StatusChanges<'_>;

    /// Get the analytics repository.
    fn analytics(&self) -> Self::Analytics<'_>;
}
