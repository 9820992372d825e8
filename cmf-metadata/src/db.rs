//! Store setup
//!
//! A metadata store is a single SQLite file. Each pool holds exactly one
//! connection, so within a process every merge owns the store for the length
//! of its transaction; other processes are held off by SQLite's file lock.

use std::path::Path;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::{MetadataError, Result};

/// Open the store at `path`, creating file and schema if missing
pub async fn open_store(path: &Path) -> Result<SqlitePool> {
    let pool = create_pool(path, true, BUSY_TIMEOUT).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Tables every store holds
const STORE_TABLES: [&str; 5] = ["pipelines", "stages", "executions", "artifacts", "events"];

/// How long a statement waits for another writer before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a store that must already exist
///
/// The schema is checked, never created: readers such as push leave the file
/// exactly as they found it.
pub async fn open_existing_store(path: &Path) -> Result<SqlitePool> {
    if !path.is_file() {
        return Err(MetadataError::StoreNotFound(path.to_path_buf()));
    }

    let pool = create_pool(path, false, BUSY_TIMEOUT).await?;
    if let Err(e) = verify_schema(&pool, path).await {
        pool.close().await;
        return Err(e);
    }
    Ok(pool)
}

async fn verify_schema(pool: &SqlitePool, path: &Path) -> Result<()> {
    let tables: Vec<String> = sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
        .fetch_all(pool)
        .await?;

    let missing: Vec<&str> = STORE_TABLES
        .into_iter()
        .filter(|table| !tables.iter().any(|t| t == table))
        .collect();

    if !missing.is_empty() {
        return Err(MetadataError::IncompatibleStore {
            path: path.to_path_buf(),
            missing: missing.join(", "),
        });
    }

    Ok(())
}

pub(crate) async fn create_pool(
    path: &Path,
    create_if_missing: bool,
    busy_timeout: Duration,
) -> std::result::Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create_if_missing)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);

    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            properties TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pipeline_id INTEGER NOT NULL REFERENCES pipelines(id),
            name TEXT NOT NULL,
            properties TEXT NOT NULL DEFAULT '{}',
            UNIQUE (pipeline_id, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // uuids holds the comma-joined UUID set
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS executions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stage_id INTEGER NOT NULL REFERENCES stages(id),
            execution_type TEXT NOT NULL,
            uuids TEXT NOT NULL,
            properties TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            uri TEXT NOT NULL,
            artifact_type TEXT NOT NULL,
            properties TEXT NOT NULL DEFAULT '{}',
            UNIQUE (name, uri)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            execution_id INTEGER NOT NULL REFERENCES executions(id),
            artifact_id INTEGER NOT NULL REFERENCES artifacts(id),
            direction TEXT NOT NULL,
            timestamp_ms INTEGER NOT NULL,
            PRIMARY KEY (execution_id, artifact_id, direction)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_executions_stage_id ON executions(stage_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_artifact_id ON events(artifact_id)")
        .execute(pool)
        .await?;

    tracing::debug!("Metadata store schema ready");
    Ok(())
}
