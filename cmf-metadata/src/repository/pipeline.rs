//! Pipeline Repository

use cmf_core::domain::pipeline::Pipeline;
use cmf_core::domain::properties::Properties;
use sqlx::SqliteConnection;
use sqlx::types::Json;

/// Insert a new pipeline
pub async fn create(
    conn: &mut SqliteConnection,
    name: &str,
    properties: &Properties,
) -> Result<Pipeline, sqlx::Error> {
    let result = sqlx::query("INSERT INTO pipelines (name, properties) VALUES (?, ?)")
        .bind(name)
        .bind(Json(properties))
        .execute(&mut *conn)
        .await?;

    Ok(Pipeline {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        properties: properties.clone(),
    })
}

/// Find a pipeline by its unique name
pub async fn find_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Pipeline>, sqlx::Error> {
    let row = sqlx::query_as::<_, PipelineRow>(
        "SELECT id, name, properties FROM pipelines WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all pipeline names in creation order
pub async fn list_names(conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT name FROM pipelines ORDER BY id")
        .fetch_all(&mut *conn)
        .await
}

/// Replace a pipeline's property bag
pub async fn update_properties(
    conn: &mut SqliteConnection,
    id: i64,
    properties: &Properties,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE pipelines SET properties = ? WHERE id = ?")
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
struct PipelineRow {
    id: i64,
    name: String,
    properties: Json<Properties>,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        Pipeline {
            id: row.id,
            name: row.name,
            properties: row.properties.0,
        }
    }
}
