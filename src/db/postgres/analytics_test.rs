//! Tests for PgAnalyticsRepository.

use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;

use crate::db::{
    AnalyticsKind, AnalyticsRepository, Database, DbError, PostgresDatabase,
    check_analytics_state,
};

#[derive(Serialize)]
struct Histogram {
    buckets: Vec<u32>,
    labels: Vec<&'static str>,
}

/// `creation_time` comes from the server clock; keep consecutive saves apart.
async fn tick() {
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
}

#[test]
fn test_check_analytics_state() {
    assert!(check_analytics_state(AnalyticsKind::OpenTaskTime, None).is_ok());
    assert!(check_analytics_state(AnalyticsKind::TaskStateTime, Some("Open")).is_ok());

    let err = check_analytics_state(AnalyticsKind::ActivityByTask, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation error: activity_by_task requires a state"
    );

    let err = check_analytics_state(AnalyticsKind::ComplexityTaskTime, Some("Open")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation error: complexity_task_time has no state column"
    );
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn get_returns_empty_when_nothing_saved(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.analytics();

    for kind in AnalyticsKind::ALL {
        let state = kind.has_state().then_some("Open");
        let records = repo.get(kind, 9999, state).await.expect("Get should succeed");
        assert!(records.is_empty(), "{kind} should be empty");
    }
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn saved_payload_is_returned_unchanged(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.analytics();

    let payload = json!({
        "histogram": { "0-1h": 3, "1-4h": [1, 2, { "nested": true }] },
        "total": 12.5,
        "note": null
    });
    repo.save_open_task_time(9999, &payload).await.expect("Save");

    let records = repo.get_open_task_time(9999).await.expect("Get");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].project_id, 9999);
    assert_eq!(records[0].state, None);
    assert_eq!(records[0].data, payload);
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn typed_payloads_are_serialized(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.analytics();

    let histogram = Histogram {
        buckets: vec![4, 0, 7],
        labels: vec!["low", "mid", "high"],
    };
    repo.save_complexity_task_time(1, &histogram).await.expect("Save");

    let records = repo.get_complexity_task_time(1).await.expect("Get");
    assert_eq!(
        records[0].data,
        json!({ "buckets": [4, 0, 7], "labels": ["low", "mid", "high"] })
    );
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn records_are_newest_first(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.analytics();

    for run in 1..=3 {
        repo.save_task_priority_count(7, "Open", &json!({ "run": run }))
            .await
            .expect("Save");
        tick().await;
    }

    let records = repo.get_task_priority_count(7, "Open").await.expect("Get");
    let runs: Vec<&serde_json::Value> = records.iter().map(|r| &r.data["run"]).collect();
    assert_eq!(runs, vec![&json!(3), &json!(2), &json!(1)]);
    assert!(
        records
            .windows(2)
            .all(|w| w[0].creation_time >= w[1].creation_time)
    );
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn get_filters_by_project_and_state(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.analytics();

    repo.save_task_state_time(1, "Open", &json!({ "hours": 1 })).await.expect("Save");
    repo.save_task_state_time(1, "Closed", &json!({ "hours": 2 })).await.expect("Save");
    repo.save_task_state_time(2, "Open", &json!({ "hours": 3 })).await.expect("Save");

    let records = repo.get_task_state_time(1, "Open").await.expect("Get");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state.as_deref(), Some("Open"));
    assert_eq!(records[0].data, json!({ "hours": 1 }));

    assert!(repo.get_task_state_time(1, "Review").await.expect("Get").is_empty());
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn save_with_wrong_state_shape_is_rejected(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    let repo = db.analytics();

    let err = repo
        .save(AnalyticsKind::ActivityByTask, 1, None, &json!({}))
        .await
        .expect_err("Missing state");
    assert!(matches!(err, DbError::Validation { .. }));

    let err = repo
        .save(AnalyticsKind::OpenTaskTime, 1, Some("Open"), &json!({}))
        .await
        .expect_err("Unexpected state");
    assert!(matches!(err, DbError::Validation { .. }));

    assert!(repo.get_open_task_time(1).await.expect("Get").is_empty());
}

async fn save_one_of_each(db: &PostgresDatabase, project_id: i32) {
    let repo = db.analytics();
    let data = json!({ "project": project_id });
    repo.save_open_task_time(project_id, &data).await.expect("open_task_time");
    repo.save_task_state_time(project_id, "Open", &data).await.expect("task_state_time");
    repo.save_complexity_task_time(project_id, &data).await.expect("complexity_task_time");
    repo.save_task_priority_count(project_id, "Open", &data).await.expect("task_priority_count");
    repo.save_activity_by_task(project_id, "Open", &data).await.expect("activity_by_task");
}

async fn count_records(db: &PostgresDatabase, project_id: i32) -> usize {
    let repo = db.analytics();
    let mut total = 0;
    for kind in AnalyticsKind::ALL {
        let state = kind.has_state().then_some("Open");
        total += repo.get(kind, project_id, state).await.expect("Get").len();
    }
    total
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn delete_all_by_project_clears_every_table(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    save_one_of_each(&db, 1).await;
    save_one_of_each(&db, 2).await;

    let removed = db.analytics().delete_all_by_project(1).await.expect("Delete");
    assert_eq!(removed, 5);
    assert_eq!(count_records(&db, 1).await, 0);
    assert_eq!(count_records(&db, 2).await, 5);

    // Nothing left to remove is not an error
    assert_eq!(db.analytics().delete_all_by_project(1).await.expect("Delete"), 0);
}

#[sqlx::test(migrations = "data/sql/postgres")]
#[ignore = "requires database"]
async fn delete_all_by_project_is_all_or_nothing(pool: PgPool) {
    let db = PostgresDatabase::from_pool(pool);
    save_one_of_each(&db, 1).await;

    // The last table in the sweep disappears, so the final DELETE fails
    sqlx::query("ALTER TABLE analytics.activity_by_task RENAME TO activity_by_task_moved")
        .execute(db.pool())
        .await
        .expect("Rename table");

    let err = db
        .analytics()
        .delete_all_by_project(1)
        .await
        .expect_err("Delete should fail");
    match &err {
        DbError::Database { message } => {
            assert!(message.contains("analytics.activity_by_task"), "got {message}")
        }
        other => panic!("expected Database error, got {other:?}"),
    }

    sqlx::query("ALTER TABLE analytics.activity_by_task_moved RENAME TO activity_by_task")
        .execute(db.pool())
        .await
        .expect("Restore table");

    assert_eq!(count_records(&db, 1).await, 5);
}
