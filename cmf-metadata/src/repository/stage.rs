//! Stage Repository

use cmf_core::domain::properties::Properties;
use cmf_core::domain::stage::Stage;
use sqlx::SqliteConnection;
use sqlx::types::Json;

/// Insert a new stage under a pipeline
pub async fn create(
    conn: &mut SqliteConnection,
    pipeline_id: i64,
    name: &str,
    properties: &Properties,
) -> Result<Stage, sqlx::Error> {
    let result = sqlx::query("INSERT INTO stages (pipeline_id, name, properties) VALUES (?, ?, ?)")
        .bind(pipeline_id)
        .bind(name)
        .bind(Json(properties))
        .execute(&mut *conn)
        .await?;

    Ok(Stage {
        id: result.last_insert_rowid(),
        pipeline_id,
        name: name.to_string(),
        properties: properties.clone(),
    })
}

/// Find a stage by `(pipeline_id, name)`
pub async fn find(
    conn: &mut SqliteConnection,
    pipeline_id: i64,
    name: &str,
) -> Result<Option<Stage>, sqlx::Error> {
    let row = sqlx::query_as::<_, StageRow>(
        "SELECT id, pipeline_id, name, properties FROM stages WHERE pipeline_id = ? AND name = ?",
    )
    .bind(pipeline_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List the stages of a pipeline in creation order
pub async fn list_by_pipeline(
    conn: &mut SqliteConnection,
    pipeline_id: i64,
) -> Result<Vec<Stage>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StageRow>(
        "SELECT id, pipeline_id, name, properties FROM stages WHERE pipeline_id = ? ORDER BY id",
    )
    .bind(pipeline_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Replace a stage's property bag
pub async fn update_properties(
    conn: &mut SqliteConnection,
    id: i64,
    properties: &Properties,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE stages SET properties = ? WHERE id = ?")
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
struct StageRow {
    id: i64,
    pipeline_id: i64,
    name: String,
    properties: Json<Properties>,
}

impl From<StageRow> for Stage {
    fn from(row: StageRow) -> Self {
        Stage {
            id: row.id,
            pipeline_id: row.pipeline_id,
            name: row.name,
            properties: row.properties.0,
        }
    }
}
