//! PostgreSQL IssueRepository implementation.

use sqlx::PgPool;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use tracing::instrument;

use super::helpers::{insert_error, store_error};
use crate::db::{CLOSED_STATUSES, DbError, DbResult, Id, Issue, IssueRepository};

const SELECT_ISSUE: &str = "SELECT id, project_id, author_id, assignee_id, key, summary, \
     description, type, priority, status, created_time, closed_time, updated_time, time_spent \
     FROM raw.issue";

const INSERT_ISSUE: &str = "INSERT INTO raw.issue \
     (id, project_id, author_id, assignee_id, key, summary, description, type, priority, \
     status, created_time, closed_time, updated_time, time_spent) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)";

/// SQLx-backed issue repository.
pub struct PgIssueRepository<'a> {
    pub(crate) pool: &'a PgPool,
}

fn validate(issue: &Issue) -> DbResult<()> {
    if issue.id == 0 {
        return Err(DbError::validation("issue id cannot be zero"));
    }
    if issue.project_id == 0 {
        return Err(DbError::validation("issue project_id cannot be zero"));
    }
    if issue.author_id == 0 {
        return Err(DbError::validation("issue author_id cannot be zero"));
    }
    if issue.assignee_id == Some(0) {
        return Err(DbError::validation("issue assignee_id cannot be zero"));
    }
    Ok(())
}

/// Bind every column in `INSERT_ISSUE` order.
fn bind_issue<'q>(
    query: Query<'q, Postgres, PgArguments>,
    issue: &'q Issue,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(issue.id)
        .bind(issue.project_id)
        .bind(issue.author_id)
        .bind(issue.assignee_id)
        .bind(&issue.key)
        .bind(&issue.summary)
        .bind(&issue.description)
        .bind(&issue.issue_type)
        .bind(&issue.priority)
        .bind(&issue.status)
        .bind(issue.created_time)
        .bind(issue.closed_time)
        .bind(issue.updated_time)
        .bind(issue.time_spent)
}

impl<'a> IssueRepository for PgIssueRepository<'a> {
    #[instrument(skip(self, issue), fields(id = issue.id), err)]
    async fn create(&self, issue: &Issue) -> DbResult<()> {
        validate(issue)?;

        bind_issue(sqlx::query(INSERT_ISSUE), issue)
            .execute(self.pool)
            .await
            .map_err(|e| insert_error("create issue", "Issue", issue.id, e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: Id) -> DbResult<Option<Issue>> {
        let sql = format!("{} WHERE id = $1", SELECT_ISSUE);
        sqlx::query_as::<_, Issue>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| store_error("get issue", e))
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> DbResult<Vec<Issue>> {
        let sql = format!("{} ORDER BY id", SELECT_ISSUE);
        sqlx::query_as::<_, Issue>(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(|e| store_error("list issues", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_project_id(&self, project_id: Id) -> DbResult<Vec<Issue>> {
        let sql = format!(
            "{} WHERE project_id = $1 ORDER BY created_time DESC NULLS LAST, id",
            SELECT_ISSUE
        );
        sqlx::query_as::<_, Issue>(&sql)
            .bind(project_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| store_error("get issues by project", e))
    }

    #[instrument(skip(self, issue), fields(id = issue.id), err)]
    async fn update(&self, issue: &Issue) -> DbResult<()> {
        validate(issue)?;

        let result = bind_issue(
            sqlx::query(
                "UPDATE raw.issue SET
                    project_id = $2, author_id = $3, assignee_id = $4, key = $5,
                    summary = $6, description = $7, type = $8, priority = $9,
                    status = $10, created_time = $11, closed_time = $12,
                    updated_time = $13, time_spent = $14
                 WHERE id = $1",
            ),
            issue,
        )
        .execute(self.pool)
        .await
        .map_err(|e| store_error("update issue", e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Issue", issue.id));
        }

        Ok(())
    }

    #[instrument(skip(self, issue), fields(id = issue.id), err)]
    async fn upsert(&self, issue: &Issue) -> DbResult<()> {
        validate(issue)?;

        let sql = format!(
            "{} ON CONFLICT (id) DO UPDATE SET
                project_id = EXCLUDED.project_id,
                author_id = EXCLUDED.author_id,
                assignee_id = EXCLUDED.assignee_id,
                key = EXCLUDED.key,
                summary = EXCLUDED.summary,
                description = EXCLUDED.description,
                type = EXCLUDED.type,
                priority = EXCLUDED.priority,
                status = EXCLUDED.status,
                created_time = EXCLUDED.created_time,
                closed_time = EXCLUDED.closed_time,
                updated_time = EXCLUDED.updated_time,
                time_spent = EXCLUDED.time_spent",
            INSERT_ISSUE
        );

        bind_issue(sqlx::query(&sql), issue)
            .execute(self.pool)
            .await
            .map_err(|e| store_error("upsert issue", e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: Id) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM raw.issue WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| store_error("delete issue", e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Issue", id));
        }

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn count(&self) -> DbResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM raw.issue")
            .fetch_one(self.pool)
            .await
            .map_err(|e| store_error("count issues", e))
    }

    #[instrument(skip(self), err)]
    async fn count_by_project(&self, project_id: Id) -> DbResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM raw.issue WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| store_error("count issues by project", e))
    }

    #[instrument(skip(self), err)]
    async fn get_open_count_by_project(&self, project_id: Id) -> DbResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM raw.issue
             WHERE project_id = $1 AND (status IS NULL OR NOT (status = ANY($2)))",
        )
        .bind(project_id)
        .bind(CLOSED_STATUSES)
        .fetch_one(self.pool)
        .await
        .map_err(|e| store_error("count open issues", e))
    }

    #[instrument(skip(self), err)]
    async fn get_closed_count_by_project(&self, project_id: Id) -> DbResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM raw.issue WHERE project_id = $1 AND status = ANY($2)",
        )
        .bind(project_id)
        .bind(CLOSED_STATUSES)
        .fetch_one(self.pool)
        .await
        .map_err(|e| store_error("count closed issues", e))
    }

    #[instrument(skip(self), err)]
    async fn get_average_time_by_project(&self, project_id: Id) -> DbResult<Option<f64>> {
        sqlx::query_scalar(
            "SELECT (AVG(EXTRACT(EPOCH FROM (closed_time - created_time))) / 3600)::float8
             FROM raw.issue
             WHERE project_id = $1
               AND closed_time IS NOT NULL
               AND created_time IS NOT NULL",
        )
        .bind(project_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| store_error("average issue time", e))
    }
}
