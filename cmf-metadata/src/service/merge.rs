//! Graph Merge Engine
//!
//! Applies a hierarchical metadata document to a store, top-down and in
//! document order. Every node goes through the identity resolver: unmatched
//! nodes are created, matched nodes get their property bags unioned and,
//! for executions, their UUID sets extended. Events are created once per
//! `(execution, artifact, direction)`.
//!
//! The document is validated and scoped before the store is touched, and the
//! whole call runs in one transaction, so a failed merge writes nothing.

use chrono::{DateTime, Utc};
use cmf_core::domain::artifact::CONTENT_HASH_PROPERTY;
use cmf_core::domain::event::Event;
use cmf_core::domain::execution::EXECUTION_UUID_PROPERTY;
use cmf_core::domain::properties::union_properties;
use cmf_core::dto::document::{
    ArtifactNode, EventNode, ExecutionNode, MergeScope, MetadataDocument, PipelineNode, StageNode,
};
use cmf_core::dto::summary::MergeSummary;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::Result;
use crate::repository::{
    artifact_repository, event_repository, execution_repository, pipeline_repository,
    stage_repository,
};
use crate::resolver::{self, Resolution};

const EXECUTION_IDENTITY_KEYS: &[&str] = &[EXECUTION_UUID_PROPERTY];
const ARTIFACT_IDENTITY_KEYS: &[&str] = &[CONTENT_HASH_PROPERTY];

/// Merge `document` into the store behind `pool`
///
/// With `MergeScope::SingleExecution` only the stage/execution path carrying
/// that UUID is applied; everything else in the document is ignored.
pub async fn merge_document(
    pool: &SqlitePool,
    document: &MetadataDocument,
    scope: &MergeScope,
) -> Result<MergeSummary> {
    let pipeline = document.scoped(scope)?;

    tracing::info!(
        pipeline = %pipeline.name,
        execution = ?scope.execution_uuid(),
        "Merging metadata document"
    );

    let mut tx = pool.begin().await?;
    let mut merger = Merger::new();
    merger.merge_pipeline(&mut *tx, &pipeline).await?;
    tx.commit().await?;

    tracing::info!(pipeline = %pipeline.name, "Merge complete: {}", merger.summary);

    Ok(merger.summary)
}

struct Merger {
    summary: MergeSummary,
    /// Timestamp for events that arrive without one
    merged_at: DateTime<Utc>,
}

impl Merger {
    fn new() -> Self {
        Self {
            summary: MergeSummary::default(),
            merged_at: Utc::now(),
        }
    }

    async fn merge_pipeline(&mut self, conn: &mut SqliteConnection, node: &PipelineNode) -> Result<()> {
        let pipeline = match resolver::resolve_pipeline(conn, &node.name).await? {
            Resolution::Existing(mut existing) => {
                if union_properties(&mut existing.properties, &node.properties, &[]) {
                    pipeline_repository::update_properties(conn, existing.id, &existing.properties)
                        .await?;
                }
                self.summary.pipelines.matched += 1;
                existing
            }
            Resolution::NotFound => {
                let created = pipeline_repository::create(conn, &node.name, &node.properties).await?;
                tracing::debug!(id = created.id, "Created pipeline {}", created.name);
                self.summary.pipelines.created += 1;
                created
            }
        };

        for stage in &node.stages {
            self.merge_stage(conn, pipeline.id, stage).await?;
        }

        Ok(())
    }

    async fn merge_stage(
        &mut self,
        conn: &mut SqliteConnection,
        pipeline_id: i64,
        node: &StageNode,
    ) -> Result<()> {
        let stage = match resolver::resolve_stage(conn, pipeline_id, &node.name).await? {
            Resolution::Existing(mut existing) => {
                if union_properties(&mut existing.properties, &node.properties, &[]) {
                    stage_repository::update_properties(conn, existing.id, &existing.properties).await?;
                }
                self.summary.stages.matched += 1;
                existing
            }
            Resolution::NotFound => {
                let created =
                    stage_repository::create(conn, pipeline_id, &node.name, &node.properties).await?;
                tracing::debug!(id = created.id, "Created stage {}", created.name);
                self.summary.stages.created += 1;
                created
            }
        };

        for execution in &node.executions {
            self.merge_execution(conn, stage.id, execution).await?;
        }

        Ok(())
    }

    async fn merge_execution(
        &mut self,
        conn: &mut SqliteConnection,
        stage_id: i64,
        node: &ExecutionNode,
    ) -> Result<()> {
        let execution = match resolver::resolve_execution(conn, stage_id, &node.uuids).await? {
            Resolution::Existing(mut existing) => {
                if existing.execution_type != node.execution_type {
                    tracing::warn!(
                        execution_id = existing.id,
                        stored = %existing.execution_type,
                        incoming = %node.execution_type,
                        "Execution {} matched with a different type; keeping the stored type",
                        node.uuids
                    );
                }

                let grew = existing.uuids.extend(&node.uuids);
                let changed = union_properties(
                    &mut existing.properties,
                    &node.properties,
                    EXECUTION_IDENTITY_KEYS,
                );

                if grew || changed {
                    execution_repository::update(conn, existing.id, &existing.uuids, &existing.properties)
                        .await?;
                }
                if grew {
                    tracing::debug!(id = existing.id, "Execution UUIDs extended to {}", existing.uuids);
                }

                self.summary.executions.matched += 1;
                existing
            }
            Resolution::NotFound => {
                let created = execution_repository::create(
                    conn,
                    stage_id,
                    &node.execution_type,
                    &node.uuids,
                    &node.properties,
                )
                .await?;
                tracing::debug!(id = created.id, "Created execution {}", created.uuids);
                self.summary.executions.created += 1;
                created
            }
        };

        for event in &node.events {
            self.merge_event(conn, execution.id, event).await?;
        }

        Ok(())
    }

    async fn merge_event(
        &mut self,
        conn: &mut SqliteConnection,
        execution_id: i64,
        node: &EventNode,
    ) -> Result<()> {
        let artifact_id = self.merge_artifact(conn, &node.artifact).await?;

        let timestamp = node
            .milliseconds_since_epoch
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(self.merged_at);

        let event = Event {
            execution_id,
            artifact_id,
            direction: node.direction,
            timestamp,
        };

        if event_repository::create_if_absent(conn, &event).await? {
            self.summary.events.created += 1;
        } else {
            self.summary.events.matched += 1;
        }

        Ok(())
    }

    async fn merge_artifact(&mut self, conn: &mut SqliteConnection, node: &ArtifactNode) -> Result<i64> {
        match resolver::resolve_artifact(conn, node).await? {
            Resolution::Existing(mut existing) => {
                if union_properties(&mut existing.properties, &node.properties, ARTIFACT_IDENTITY_KEYS) {
                    artifact_repository::update_properties(conn, existing.id, &existing.properties)
                        .await?;
                }
                self.summary.artifacts.matched += 1;
                Ok(existing.id)
            }
            Resolution::NotFound => {
                let created = artifact_repository::create(
                    conn,
                    &node.name,
                    &node.uri,
                    &node.artifact_type,
                    &node.properties,
                )
                .await?;
                tracing::debug!(id = created.id, "Created artifact {} ({})", created.name, created.uri);
                self.summary.artifacts.created += 1;
                Ok(created.id)
            }
        }
    }
}
