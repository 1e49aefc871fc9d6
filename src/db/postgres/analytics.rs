//! PostgreSQL AnalyticsRepository implementation.
//!
//! All five analytics tables share one shape, so a single implementation
//! serves every [`AnalyticsKind`]; only the table name and whether a
//! `state` column exists differ.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, instrument};

use super::helpers::{rollback, store_error};
use crate::db::{
    AnalyticsKind, AnalyticsRecord, AnalyticsRepository, DbError, DbResult, Id,
    check_analytics_state,
};

/// SQLx-backed analytics repository.
pub struct PgAnalyticsRepository<'a> {
    pub(crate) pool: &'a PgPool,
}

fn insert_sql(kind: AnalyticsKind) -> String {
    if kind.has_state() {
        format!(
            "INSERT INTO {} (id_project, creation_time, state, data) VALUES ($1, NOW(), $2, $3)",
            kind.table()
        )
    } else {
        format!(
            "INSERT INTO {} (id_project, creation_time, data) VALUES ($1, NOW(), $2)",
            kind.table()
        )
    }
}

fn select_sql(kind: AnalyticsKind) -> String {
    if kind.has_state() {
        format!(
            "SELECT id_project, creation_time, state, data FROM {}
             WHERE id_project = $1 AND state = $2
             ORDER BY creation_time DESC",
            kind.table()
        )
    } else {
        format!(
            "SELECT id_project, creation_time, NULL::text AS state, data FROM {}
             WHERE id_project = $1
             ORDER BY creation_time DESC",
            kind.table()
        )
    }
}

impl<'a> AnalyticsRepository for PgAnalyticsRepository<'a> {
    #[instrument(skip(self, kind, data), fields(kind = %kind), err)]
    async fn save<T>(
        &self,
        kind: AnalyticsKind,
        project_id: Id,
        state: Option<&str>,
        data: &T,
    ) -> DbResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        check_analytics_state(kind, state)?;

        let payload = serde_json::to_value(data).map_err(|e| DbError::Serialization {
            message: format!("{} payload: {}", kind, e),
        })?;

        let sql = insert_sql(kind);
        let mut query = sqlx::query(&sql).bind(project_id);
        if let Some(state) = state {
            query = query.bind(state);
        }

        query
            .bind(&payload)
            .execute(self.pool)
            .await
            .map_err(|e| store_error(&format!("save {}", kind), e))?;

        Ok(())
    }

    #[instrument(skip(self, kind), fields(kind = %kind), err)]
    async fn get(
        &self,
        kind: AnalyticsKind,
        project_id: Id,
        state: Option<&str>,
    ) -> DbResult<Vec<AnalyticsRecord>> {
        check_analytics_state(kind, state)?;

        let sql = select_sql(kind);
        let mut query = sqlx::query_as::<_, AnalyticsRecord>(&sql).bind(project_id);
        if let Some(state) = state {
            query = query.bind(state);
        }

        query
            .fetch_all(self.pool)
            .await
            .map_err(|e| store_error(&format!("get {}", kind), e))
    }

    #[instrument(skip(self), err)]
    async fn delete_all_by_project(&self, project_id: Id) -> DbResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("begin analytics cleanup", e))?;

        let mut removed = 0;
        for kind in AnalyticsKind::ALL {
            let sql = format!("DELETE FROM {} WHERE id_project = $1", kind.table());
            let deleted = sqlx::query(&sql)
                .bind(project_id)
                .execute(&mut *tx)
                .await;

            match deleted {
                Ok(result) => removed += result.rows_affected(),
                Err(e) => {
                    rollback(tx, "delete analytics by project").await;
                    return Err(store_error(&format!("delete from {}", kind.table()), e));
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| store_error("commit analytics cleanup", e))?;

        debug!(project_id, removed, "analytics removed");
        Ok(removed)
    }
}
