//! Smoke test driver for the tracker store.
//!
//! Connects with the `DB_*` environment (optionally overridden by flags),
//! writes one project, author and issue, records a status change, stores
//! a payload in every analytics table, reads it all back and removes the
//! test data again.

use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracker_store::config::{DbConfig, PoolSettings};
use tracker_store::db::{
    AnalyticsRepository, Author, AuthorRepository, Database, DbResult, Issue, IssueRepository,
    PostgresDatabase, Project, ProjectRepository, StatusChange, StatusChangeRepository,
};

const PROJECT_ID: i32 = 9999;
const AUTHOR_ID: i32 = 8888;
const ISSUE_ID: i32 = 7777;

#[derive(Parser)]
#[command(name = "tracker-smoke")]
#[command(author, version, about = "Exercise every tracker store repository", long_about = None)]
struct Cli {
    /// Database host (overrides DB_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Database port (overrides DB_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Database user (overrides DB_USER)
    #[arg(short, long)]
    user: Option<String>,

    /// Database name (overrides DB_NAME)
    #[arg(long)]
    dbname: Option<String>,

    /// SSL mode (overrides DB_SSLMODE)
    #[arg(long)]
    sslmode: Option<String>,

    /// Seconds to wait for the server to answer the liveness check
    #[arg(long, default_value = "10")]
    ping_timeout: u64,

    /// Leave the test rows in place instead of cleaning up
    #[arg(long)]
    keep: bool,
}

impl Cli {
    fn config(&self) -> DbResult<DbConfig> {
        let mut config = DbConfig::from_env()?;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(name) = &self.dbname {
            config.name = name.clone();
        }
        if let Some(ssl_mode) = &self.sslmode {
            config.ssl_mode = ssl_mode.clone();
        }
        Ok(config)
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracker_store=debug,tracker_smoke=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn projects(db: &PostgresDatabase) -> DbResult<()> {
    let repo = db.projects();
    repo.upsert(&Project {
        id: PROJECT_ID,
        title: "Test Project".to_string(),
    })
    .await?;

    if let Some(project) = repo.get(PROJECT_ID).await? {
        info!(id = project.id, title = %project.title, "Project found");
    }

    let all = repo.list().await?;
    if let Some(first) = all.first() {
        info!(id = first.id, title = %first.title, "First project");
    }
    info!(count = repo.count().await?, "Projects in store");
    Ok(())
}

async fn authors(db: &PostgresDatabase) -> DbResult<()> {
    let repo = db.authors();
    let author: Author = repo.get_or_create(AUTHOR_ID, "Test Author").await?;
    info!(id = author.id, name = %author.name, "Author created or retrieved");

    if let Some(found) = repo.get(AUTHOR_ID).await? {
        info!(id = found.id, name = %found.name, "Author found");
    }
    Ok(())
}

async fn issues(db: &PostgresDatabase) -> DbResult<()> {
    let repo = db.issues();
    let now = Utc::now();
    repo.upsert(&Issue {
        id: ISSUE_ID,
        project_id: PROJECT_ID,
        author_id: AUTHOR_ID,
        assignee_id: Some(AUTHOR_ID),
        key: format!("TEST-{ISSUE_ID}"),
        summary: Some("Test issue summary".to_string()),
        description: Some("Test description".to_string()),
        issue_type: Some("Bug".to_string()),
        priority: Some("Medium".to_string()),
        status: Some("Open".to_string()),
        created_time: Some(now),
        closed_time: None,
        updated_time: Some(now),
        time_spent: Some(120),
    })
    .await?;

    if let Some(issue) = repo.get(ISSUE_ID).await? {
        info!(
            id = issue.id,
            key = %issue.key,
            status = issue.status.as_deref().unwrap_or("NULL"),
            "Issue found"
        );
    }

    let in_project = repo.get_by_project_id(PROJECT_ID).await?;
    info!(project_id = PROJECT_ID, count = in_project.len(), "Issues in project");

    let open = repo.get_open_count_by_project(PROJECT_ID).await?;
    let closed = repo.get_closed_count_by_project(PROJECT_ID).await?;
    let average = repo.get_average_time_by_project(PROJECT_ID).await?;
    info!(project_id = PROJECT_ID, open, closed, average_hours = ?average, "Project statistics");
    Ok(())
}

async fn status_changes(db: &PostgresDatabase) -> DbResult<()> {
    let repo = db.status_changes();
    let now = Utc::now();
    repo.bulk_insert(&[
        StatusChange {
            issue_id: ISSUE_ID,
            author_id: AUTHOR_ID,
            change_time: now,
            from_status: "Open".to_string(),
            to_status: "In Progress".to_string(),
        },
        StatusChange {
            issue_id: ISSUE_ID,
            author_id: AUTHOR_ID,
            change_time: now + chrono::Duration::minutes(30),
            from_status: "In Progress".to_string(),
            to_status: "Review".to_string(),
        },
    ])
    .await?;

    let history = repo.get_by_issue_id(ISSUE_ID).await?;
    info!(issue_id = ISSUE_ID, count = history.len(), "Status changes recorded");
    Ok(())
}

async fn analytics(db: &PostgresDatabase) -> DbResult<()> {
    let repo = db.analytics();
    let payload = json!({
        "bins": [10, 20, 30],
        "values": [5, 15, 25],
    });

    repo.save_open_task_time(PROJECT_ID, &payload).await?;
    repo.save_task_state_time(PROJECT_ID, "Open", &payload).await?;
    repo.save_complexity_task_time(PROJECT_ID, &payload).await?;
    repo.save_task_priority_count(PROJECT_ID, "Open", &payload).await?;
    repo.save_activity_by_task(PROJECT_ID, "Open", &payload).await?;
    info!(project_id = PROJECT_ID, "Saved a payload in every analytics table");

    let open_task_time = repo.get_open_task_time(PROJECT_ID).await?;
    info!(
        project_id = PROJECT_ID,
        count = open_task_time.len(),
        "Records in open_task_time"
    );
    Ok(())
}

async fn cleanup(db: &PostgresDatabase) -> DbResult<()> {
    let removed = db.analytics().delete_all_by_project(PROJECT_ID).await?;
    let changes = db.status_changes().delete_by_issue_id(ISSUE_ID).await?;
    db.issues().delete(ISSUE_ID).await?;
    db.authors().delete(AUTHOR_ID).await?;
    db.projects().delete(PROJECT_ID).await?;
    info!(analytics = removed, status_changes = changes, "Test data removed");
    Ok(())
}

async fn run(cli: &Cli, db: &PostgresDatabase) -> DbResult<()> {
    info!("Step 1: projects");
    projects(db).await?;

    info!("Step 2: authors");
    authors(db).await?;

    info!("Step 3: issues");
    issues(db).await?;

    info!("Step 4: status changes");
    status_changes(db).await?;

    info!("Step 5: analytics");
    analytics(db).await?;

    if !cli.keep {
        cleanup(db).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.config()?;
    let settings = PoolSettings {
        ping_timeout: Duration::from_secs(cli.ping_timeout),
        ..PoolSettings::default()
    };
    let db = PostgresDatabase::connect_with(&config, settings).await?;

    let outcome = run(&cli, &db).await;
    db.close().await;
    outcome?;

    info!("All steps completed");
    Ok(())
}
