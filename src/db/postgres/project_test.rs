//! Tests for PgProjectRepository.
//!
//! Each test runs against a fresh database created by `sqlx::test`.
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use sqlx::PgPool;

use crate::db::{Database, DbError, PostgresDatabase, Project, ProjectRepository};

fn project(id: i32, title: &str) -> Project {
    Project {
        id,
        title: title.to_string(),
    }
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn create_and_get_project(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.projects();

    let created = project(9999, "Test Project");
    repo.create(&created).await.expect("Create should succeed");

    let retrieved = repo
        .get(9999)
        .await
        .expect("Get should succeed")
        .expect("Project should exist");
    assert_eq!(retrieved, created);
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn get_nonexistent_project_returns_none(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);

    let result = db.projects().get(424242).await.expect("Get should succeed");
    assert!(result.is_none());
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn create_duplicate_project_fails_with_already_exists(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.projects();

    repo.create(&project(1, "First")).await.expect("Create should succeed");

    let err = repo
        .create(&project(1, "Second"))
        .await
        .expect_err("Duplicate create should fail");
    assert!(matches!(err, DbError::AlreadyExists { .. }), "got {err:?}");

    // Upsert with the same identity never fails and overwrites the title
    repo.upsert(&project(1, "Second"))
        .await
        .expect("Upsert should succeed");
    let stored = repo.get(1).await.expect("Get").expect("exists");
    assert_eq!(stored.title, "Second");
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn upsert_is_idempotent(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.projects();

    let p = project(77, "Idempotent");
    for _ in 0..3 {
        repo.upsert(&p).await.expect("Upsert should succeed");
    }

    assert_eq!(repo.count().await.expect("Count"), 1);
    assert_eq!(repo.get(77).await.expect("Get"), Some(p));
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn create_rejects_invalid_projects(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.projects();

    let err = repo.create(&project(0, "No id")).await.expect_err("zero id");
    assert!(matches!(err, DbError::Validation { .. }));

    let err = repo.create(&project(5, "  ")).await.expect_err("blank title");
    assert!(matches!(err, DbError::Validation { .. }));

    assert_eq!(repo.count().await.expect("Count"), 0);
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn list_projects_ordered_by_id(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.projects();

    for (id, title) in [(30, "C"), (10, "A"), (20, "B")] {
        repo.create(&project(id, title)).await.expect("Create");
    }

    let ids: Vec<i32> = repo
        .list()
        .await
        .expect("List should succeed")
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![10, 20, 30]);
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn update_project(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.projects();

    repo.create(&project(3, "Original")).await.expect("Create");
    repo.update(&project(3, "Updated")).await.expect("Update");

    let retrieved = repo.get(3).await.expect("Get").expect("exists");
    assert_eq!(retrieved.title, "Updated");
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn update_missing_project_fails_with_not_found(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);

    let err = db
        .projects()
        .update(&project(404, "Ghost"))
        .await
        .expect_err("Update should fail");
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn delete_project(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.projects();

    repo.create(&project(8, "To Delete")).await.expect("Create");
    repo.delete(8).await.expect("Delete should succeed");

    assert!(repo.get(8).await.expect("Get").is_none());

    let err = repo.delete(8).await.expect_err("Second delete should fail");
    assert!(matches!(err, DbError::NotFound { .. }));
}
