//! PostgreSQL StatusChangeRepository implementation.

use sqlx::PgPool;
use tracing::{debug, instrument};

use super::helpers::{rollback, store_error};
use crate::db::{DbError, DbResult, Id, StatusChange, StatusChangeRepository};

const INSERT_STATUS_CHANGE: &str = "INSERT INTO raw.status_changes \
     (issue_id, author_id, change_time, from_status, to_status) \
     VALUES ($1, $2, $3, $4, $5)";

/// SQLx-backed status change repository.
pub struct PgStatusChangeRepository<'a> {
    pub(crate) pool: &'a PgPool,
}

fn validate(change: &StatusChange) -> DbResult<()> {
    if change.issue_id == 0 {
        return Err(DbError::validation("status change issue_id cannot be zero"));
    }
    if change.author_id == 0 {
        return Err(DbError::validation("status change author_id cannot be zero"));
    }
    Ok(())
}

impl<'a> StatusChangeRepository for PgStatusChangeRepository<'a> {
    #[instrument(skip(self, change), fields(issue_id = change.issue_id), err)]
    async fn create(&self, change: &StatusChange) -> DbResult<()> {
        validate(change)?;

        sqlx::query(INSERT_STATUS_CHANGE)
            .bind(change.issue_id)
            .bind(change.author_id)
            .bind(change.change_time)
            .bind(&change.from_status)
            .bind(&change.to_status)
            .execute(self.pool)
            .await
            .map_err(|e| store_error("create status change", e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_by_issue_id(&self, issue_id: Id) -> DbResult<Vec<StatusChange>> {
        sqlx::query_as::<_, StatusChange>(
            "SELECT issue_id, author_id, change_time, from_status, to_status
             FROM raw.status_changes
             WHERE issue_id = $1
             ORDER BY change_time ASC",
        )
        .bind(issue_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| store_error("get status changes by issue", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_project_id(&self, project_id: Id) -> DbResult<Vec<StatusChange>> {
        sqlx::query_as::<_, StatusChange>(
            "SELECT sc.issue_id, sc.author_id, sc.change_time, sc.from_status, sc.to_status
             FROM raw.status_changes sc
             JOIN raw.issue i ON sc.issue_id = i.id
             WHERE i.project_id = $1
             ORDER BY sc.change_time ASC",
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| store_error("get status changes by project", e))
    }

    #[instrument(skip(self, changes), fields(count = changes.len()), err)]
    async fn bulk_insert(&self, changes: &[StatusChange]) -> DbResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        for change in changes {
            validate(change)?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("begin status change batch", e))?;

        for (index, change) in changes.iter().enumerate() {
            let inserted = sqlx::query(INSERT_STATUS_CHANGE)
                .bind(change.issue_id)
                .bind(change.author_id)
                .bind(change.change_time)
                .bind(&change.from_status)
                .bind(&change.to_status)
                .execute(&mut *tx)
                .await;

            if let Err(e) = inserted {
                rollback(tx, "bulk insert status changes").await;
                return Err(store_error(
                    &format!("insert status change {} of {}", index + 1, changes.len()),
                    e,
                ));
            }
        }

        tx.commit()
            .await
            .map_err(|e| store_error("commit status change batch", e))?;

        debug!(count = changes.len(), "status change batch committed");
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_by_issue_id(&self, issue_id: Id) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM raw.status_changes WHERE issue_id = $1")
            .bind(issue_id)
            .execute(self.pool)
            .await
            .map_err(|e| store_error("delete status changes", e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StatusChange", issue_id));
        }

        Ok(result.rows_affected())
    }
}
