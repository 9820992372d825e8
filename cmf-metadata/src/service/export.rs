//! Subgraph export
//!
//! Reads a pipeline back out of a store as a hierarchical document, in
//! insertion order. Merging the result into an empty store reproduces it.

use cmf_core::domain::artifact::Artifact;
use cmf_core::domain::event::Event;
use cmf_core::domain::execution::Execution;
use cmf_core::dto::document::{
    ArtifactNode, EventNode, ExecutionNode, MergeScope, MetadataDocument, PipelineNode, StageNode,
};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{MetadataError, Result};
use crate::repository::{
    event_repository, execution_repository, pipeline_repository, stage_repository,
};

/// Export `pipeline_name`, optionally restricted to one execution
pub async fn export_pipeline(
    pool: &SqlitePool,
    pipeline_name: &str,
    scope: &MergeScope,
) -> Result<MetadataDocument> {
    let mut conn = pool.acquire().await?;

    let pipeline = pipeline_repository::find_by_name(&mut *conn, pipeline_name)
        .await?
        .ok_or_else(|| MetadataError::PipelineNotFound(pipeline_name.to_string()))?;

    let uuid = scope.execution_uuid();
    let mut stages = Vec::new();

    for stage in stage_repository::list_by_pipeline(&mut *conn, pipeline.id).await? {
        let mut executions = Vec::new();

        for execution in execution_repository::list_by_stage(&mut *conn, stage.id).await? {
            if uuid.is_some_and(|uuid| !execution.uuids.contains(uuid)) {
                continue;
            }
            executions.push(export_execution(&mut *conn, execution).await?);
        }

        // A scoped export keeps only the stages on the execution's path
        if uuid.is_some() && executions.is_empty() {
            continue;
        }

        stages.push(StageNode {
            name: stage.name,
            properties: stage.properties,
            executions,
        });
    }

    if let (Some(uuid), true) = (uuid, stages.is_empty()) {
        return Err(MetadataError::ExecutionUuidNotFound(uuid.to_string()));
    }

    tracing::debug!(
        pipeline = %pipeline.name,
        stages = stages.len(),
        "Exported pipeline subgraph"
    );

    Ok(MetadataDocument::new(PipelineNode {
        name: pipeline.name,
        properties: pipeline.properties,
        stages,
    }))
}

/// Names of every pipeline in the store
pub async fn list_pipelines(pool: &SqlitePool) -> Result<Vec<String>> {
    let mut conn = pool.acquire().await?;
    Ok(pipeline_repository::list_names(&mut *conn).await?)
}

async fn export_execution(conn: &mut SqliteConnection, execution: Execution) -> Result<ExecutionNode> {
    let events = event_repository::list_with_artifacts(conn, execution.id)
        .await?
        .into_iter()
        .map(|(event, artifact)| export_event(event, artifact))
        .collect();

    Ok(ExecutionNode {
        id: Some(execution.id),
        execution_type: execution.execution_type,
        uuids: execution.uuids,
        properties: execution.properties,
        events,
    })
}

fn export_event(event: Event, artifact: Artifact) -> EventNode {
    EventNode {
        direction: event.direction,
        milliseconds_since_epoch: Some(event.timestamp.timestamp_millis()),
        artifact: ArtifactNode {
            id: Some(artifact.id),
            name: artifact.name,
            uri: artifact.uri,
            artifact_type: artifact.artifact_type,
            properties: artifact.properties,
        },
    }
}
