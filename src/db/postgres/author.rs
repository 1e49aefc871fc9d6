//! PostgreSQL AuthorRepository implementation.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use super::helpers::{insert_error, push_ilike_filter, push_limit_offset, store_error, substring_pattern};
use crate::db::{Author, AuthorQuery, AuthorRepository, DbError, DbResult, Id, ListResult};

/// SQLx-backed author repository.
pub struct PgAuthorRepository<'a> {
    pub(crate) pool: &'a PgPool,
}

fn validate(author: &Author) -> DbResult<()> {
    if author.name.is_empty() {
        return Err(DbError::validation("author name cannot be empty"));
    }
    if author.id == 0 {
        return Err(DbError::validation("author id cannot be zero"));
    }
    Ok(())
}

impl<'a> AuthorRepository for PgAuthorRepository<'a> {
    #[instrument(skip(self, author), fields(id = author.id), err)]
    async fn create(&self, author: &Author) -> DbResult<()> {
        validate(author)?;

        sqlx::query("INSERT INTO raw.author (id, name) VALUES ($1, $2)")
            .bind(author.id)
            .bind(&author.name)
            .execute(self.pool)
            .await
            .map_err(|e| insert_error("create author", "Author", author.id, e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: Id) -> DbResult<Option<Author>> {
        sqlx::query_as::<_, Author>("SELECT id, name FROM raw.author WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| store_error("get author by id", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_name(&self, name: &str) -> DbResult<Option<Author>> {
        sqlx::query_as::<_, Author>("SELECT id, name FROM raw.author WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| store_error("get author by name", e))
    }

    #[instrument(skip(self), err)]
    async fn list(&self, query: Option<&AuthorQuery>) -> DbResult<ListResult<Author>> {
        let default_query = AuthorQuery::default();
        let query = query.unwrap_or(&default_query);
        let pattern = substring_pattern(query.search.as_deref());

        let mut select = QueryBuilder::<Postgres>::new("SELECT id, name FROM raw.author");
        push_ilike_filter(&mut select, "name", pattern.clone());
        select.push(" ORDER BY name, id");
        push_limit_offset(&mut select, &query.page);

        let items = select
            .build_query_as::<Author>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| store_error("list authors", e))?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM raw.author");
        push_ilike_filter(&mut count, "name", pattern);

        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool)
            .await
            .map_err(|e| store_error("count authors", e))?;

        Ok(ListResult {
            items,
            total: total as usize,
            limit: query.page.effective_limit(),
            offset: query.page.effective_offset(),
        })
    }

    #[instrument(skip(self, author), fields(id = author.id), err)]
    async fn update(&self, author: &Author) -> DbResult<()> {
        validate(author)?;

        let result = sqlx::query("UPDATE raw.author SET name = $1 WHERE id = $2")
            .bind(&author.name)
            .bind(author.id)
            .execute(self.pool)
            .await
            .map_err(|e| store_error("update author", e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Author", author.id));
        }

        Ok(())
    }

    #[instrument(skip(self, author), fields(id = author.id), err)]
    async fn upsert(&self, author: &Author) -> DbResult<()> {
        validate(author)?;

        sqlx::query(
            "INSERT INTO raw.author (id, name) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(author.id)
        .bind(&author.name)
        .execute(self.pool)
        .await
        .map_err(|e| store_error("upsert author", e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_or_create(&self, id: Id, name: &str) -> DbResult<Author> {
        let author = Author {
            id,
            name: name.to_string(),
        };
        validate(&author)?;

        sqlx::query_as::<_, Author>(
            "INSERT INTO raw.author (id, name) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name",
        )
        .bind(author.id)
        .bind(&author.name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| store_error("get or create author", e))
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: Id) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM raw.author WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| store_error("delete author", e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Author", id));
        }

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn count(&self) -> DbResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM raw.author")
            .fetch_one(self.pool)
            .await
            .map_err(|e| store_error("count authors", e))
    }
}
