//! PostgreSQL ProjectRepository implementation.

use sqlx::PgPool;
use tracing::instrument;

use super::helpers::{insert_error, store_error};
use crate::db::{DbError, DbResult, Id, Project, ProjectRepository};

/// SQLx-backed project repository.
pub struct PgProjectRepository<'a> {
    pub(crate) pool: &'a PgPool,
}

fn validate(project: &Project) -> DbResult<()> {
    if project.id == 0 {
        return Err(DbError::validation("project id cannot be zero"));
    }
    if project.title.trim().is_empty() {
        return Err(DbError::validation("project title cannot be empty"));
    }
    Ok(())
}

impl<'a> ProjectRepository for PgProjectRepository<'a> {
    #[instrument(skip(self, project), fields(id = project.id), err)]
    async fn create(&self, project: &Project) -> DbResult<()> {
        validate(project)?;

        sqlx::query("INSERT INTO raw.project (id, title) VALUES ($1, $2)")
            .bind(project.id)
            .bind(&project.title)
            .execute(self.pool)
            .await
            .map_err(|e| insert_error("create project", "Project", project.id, e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: Id) -> DbResult<Option<Project>> {
        sqlx::query_as::<_, Project>("SELECT id, title FROM raw.project WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| store_error("get project", e))
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> DbResult<Vec<Project>> {
        sqlx::query_as::<_, Project>("SELECT id, title FROM raw.project ORDER BY id")
            .fetch_all(self.pool)
            .await
            .map_err(|e| store_error("list projects", e))
    }

    #[instrument(skip(self, project), fields(id = project.id), err)]
    async fn update(&self, project: &Project) -> DbResult<()> {
        validate(project)?;

        let result = sqlx::query("UPDATE raw.project SET title = $1 WHERE id = $2")
            .bind(&project.title)
            .bind(project.id)
            .execute(self.pool)
            .await
            .map_err(|e| store_error("update project", e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Project", project.id));
        }

        Ok(())
    }

    #[instrument(skip(self, project), fields(id = project.id), err)]
    async fn upsert(&self, project: &Project) -> DbResult<()> {
        validate(project)?;

        sqlx::query(
            "INSERT INTO raw.project (id, title) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title",
        )
        .bind(project.id)
        .bind(&project.title)
        .execute(self.pool)
        .await
        .map_err(|e| store_error("upsert project", e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: Id) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM raw.project WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| store_error("delete project", e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Project", id));
        }

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn count(&self) -> DbResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM raw.project")
            .fetch_one(self.pool)
            .await
            .map_err(|e| store_error("count projects", e))
    }
}
