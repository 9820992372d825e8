//! Artifact Repository

use cmf_core::domain::artifact::Artifact;
use cmf_core::domain::properties::Properties;
use sqlx::SqliteConnection;
use sqlx::types::Json;

/// Insert a new artifact
pub async fn create(
    conn: &mut SqliteConnection,
    name: &str,
    uri: &str,
    artifact_type: &str,
    properties: &Properties,
) -> Result<Artifact, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO artifacts (name, uri, artifact_type, properties) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(uri)
    .bind(artifact_type)
    .bind(Json(properties))
    .execute(&mut *conn)
    .await?;

    Ok(Artifact {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        uri: uri.to_string(),
        artifact_type: artifact_type.to_string(),
        properties: properties.clone(),
    })
}

/// Find an artifact by its `(name, uri)` identity
pub async fn find_by_name_and_uri(
    conn: &mut SqliteConnection,
    name: &str,
    uri: &str,
) -> Result<Option<Artifact>, sqlx::Error> {
    let row = sqlx::query_as::<_, ArtifactRow>(
        r#"
        SELECT id, name, uri, artifact_type, properties
        FROM artifacts
        WHERE name = ? AND uri = ?
        "#,
    )
    .bind(name)
    .bind(uri)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Replace an artifact's property bag
pub async fn update_properties(
    conn: &mut SqliteConnection,
    id: i64,
    properties: &Properties,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE artifacts SET properties = ? WHERE id = ?")
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
struct ArtifactRow {
    id: i64,
    name: String,
    uri: String,
    artifact_type: String,
    properties: Json<Properties>,
}

impl From<ArtifactRow> for Artifact {
    fn from(row: ArtifactRow) -> Self {
        Artifact {
            id: row.id,
            name: row.name,
            uri: row.uri,
            artifact_type: row.artifact_type,
            properties: row.properties.0,
        }
    }
}
