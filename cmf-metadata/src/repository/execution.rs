//! Execution Repository
//!
//! The UUID set is stored comma-joined; this is the only place that form
//! is read or written.

use cmf_core::domain::execution::{Execution, UuidSet};
use cmf_core::domain::properties::Properties;
use sqlx::SqliteConnection;
use sqlx::types::Json;

/// Insert a new execution under a stage
pub async fn create(
    conn: &mut SqliteConnection,
    stage_id: i64,
    execution_type: &str,
    uuids: &UuidSet,
    properties: &Properties,
) -> Result<Execution, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO executions (stage_id, execution_type, uuids, properties) VALUES (?, ?, ?, ?)",
    )
    .bind(stage_id)
    .bind(execution_type)
    .bind(uuids.to_joined())
    .bind(Json(properties))
    .execute(&mut *conn)
    .await?;

    Ok(Execution {
        id: result.last_insert_rowid(),
        stage_id,
        execution_type: execution_type.to_string(),
        uuids: uuids.clone(),
        properties: properties.clone(),
    })
}

/// List the executions of a stage in creation order
pub async fn list_by_stage(
    conn: &mut SqliteConnection,
    stage_id: i64,
) -> Result<Vec<Execution>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ExecutionRow>(
        r#"
        SELECT id, stage_id, execution_type, uuids, properties
        FROM executions
        WHERE stage_id = ?
        ORDER BY id
        "#,
    )
    .bind(stage_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Store a grown UUID set and merged property bag
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    uuids: &UuidSet,
    properties: &Properties,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE executions SET uuids = ?, properties = ? WHERE id = ?")
        .bind(uuids.to_joined())
        .bind(Json(properties))
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ExecutionRow {
    id: i64,
    stage_id: i64,
    execution_type: String,
    uuids: String,
    properties: Json<Properties>,
}

impl From<ExecutionRow> for Execution {
    fn from(row: ExecutionRow) -> Self {
        Execution {
            id: row.id,
            stage_id: row.stage_id,
            execution_type: row.execution_type,
            uuids: UuidSet::parse(&row.uuids),
            properties: row.properties.0,
        }
    }
}
