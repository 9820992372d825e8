//! Event Repository
//!
//! Events are created at most once per `(execution_id, artifact_id,
//! direction)` and never updated.

use chrono::{DateTime, Utc};
use cmf_core::domain::artifact::Artifact;
use cmf_core::domain::event::Event;
use cmf_core::domain::properties::Properties;
use sqlx::SqliteConnection;
use sqlx::types::Json;

/// Insert an event unless the same triple already exists
///
/// Returns `true` if a new event was written.
pub async fn create_if_absent(conn: &mut SqliteConnection, event: &Event) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO events (execution_id, artifact_id, direction, timestamp_ms)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(event.execution_id)
    .bind(event.artifact_id)
    .bind(event.direction.as_str())
    .bind(event.timestamp.timestamp_millis())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// List an execution's events with the artifacts they reference, in creation order
pub async fn list_with_artifacts(
    conn: &mut SqliteConnection,
    execution_id: i64,
) -> Result<Vec<(Event, Artifact)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EventArtifactRow>(
        r#"
        SELECT e.execution_id, e.artifact_id, e.direction, e.timestamp_ms,
               a.name, a.uri, a.artifact_type, a.properties
        FROM events e
        JOIN artifacts a ON a.id = e.artifact_id
        WHERE e.execution_id = ?
        ORDER BY e.rowid
        "#,
    )
    .bind(execution_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(<(Event, Artifact)>::try_from).collect()
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct EventArtifactRow {
    execution_id: i64,
    artifact_id: i64,
    direction: String,
    timestamp_ms: i64,
    name: String,
    uri: String,
    artifact_type: String,
    properties: Json<Properties>,
}

impl TryFrom<EventArtifactRow> for (Event, Artifact) {
    type Error = sqlx::Error;

    fn try_from(row: EventArtifactRow) -> Result<Self, Self::Error> {
        let direction = row
            .direction
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        let event = Event {
            execution_id: row.execution_id,
            artifact_id: row.artifact_id,
            direction,
            timestamp: DateTime::<Utc>::from_timestamp_millis(row.timestamp_ms).unwrap_or_default(),
        };

        let artifact = Artifact {
            id: row.artifact_id,
            name: row.name,
            uri: row.uri,
            artifact_type: row.artifact_type,
            properties: row.properties.0,
        };

        Ok((event, artifact))
    }
}
