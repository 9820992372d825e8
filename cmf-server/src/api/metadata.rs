//! Metadata API Handlers
//!
//! Push merges a client's subgraph into the server store; pull exports one.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use cmf_core::dto::document::MergeScope;
use cmf_core::dto::summary::MergeSummary;
use cmf_core::dto::transfer::{NO_EXECUTION_SENTINEL, PROTOCOL_VERSION, PullQuery, PushRequest};
use cmf_metadata::MetadataError;
use cmf_metadata::service::{export_service, merge_service};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::api::error::{ApiError, ApiResult};

/// Read ahead of the full request so an outdated client gets a version
/// error rather than a parse error
#[derive(Deserialize)]
struct VersionField {
    protocol_version: Option<u32>,
}

/// POST /mlmd_push
/// Merge a pushed subgraph into the server store
pub async fn push_metadata(State(pool): State<SqlitePool>, body: Bytes) -> ApiResult<Json<MergeSummary>> {
    let versioned: VersionField = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid push request: {}", e)))?;
    check_version(versioned.protocol_version)?;

    let request: PushRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid push request: {}", e)))?;

    let pipeline = request
        .document
        .pipeline()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if pipeline.name != request.pipeline_name {
        return Err(ApiError::BadRequest(format!(
            "Request names pipeline '{}' but the document holds '{}'",
            request.pipeline_name, pipeline.name
        )));
    }

    tracing::info!(
        pipeline = %request.pipeline_name,
        execution = ?request.execution_uuid,
        "Received metadata push"
    );

    let scope = MergeScope::from_execution_uuid(request.execution_uuid.as_deref());
    let summary = merge_service::merge_document(&pool, &request.document, &scope).await?;

    Ok(Json(summary))
}

/// GET /mlmd_pull/{pipeline}
/// Export a pipeline, optionally scoped to one execution
pub async fn pull_metadata(
    State(pool): State<SqlitePool>,
    Path(pipeline): Path<String>,
    Query(query): Query<PullQuery>,
) -> ApiResult<Response> {
    check_version(query.protocol_version)?;

    tracing::info!(pipeline = %pipeline, execution = ?query.exec_uuid, "Serving metadata pull");

    if export_service::list_pipelines(&pool).await?.is_empty() {
        return Err(ApiError::NoMetadata);
    }

    let scope = MergeScope::from_execution_uuid(query.exec_uuid.as_deref());
    match export_service::export_pipeline(&pool, &pipeline, &scope).await {
        Ok(document) => Ok(Json(document).into_response()),
        Err(MetadataError::ExecutionUuidNotFound(uuid)) => {
            tracing::debug!(pipeline = %pipeline, "Execution {} not found", uuid);
            Ok(NO_EXECUTION_SENTINEL.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /pipelines
/// List pipeline names held by the server
pub async fn list_pipelines(State(pool): State<SqlitePool>) -> ApiResult<Json<Vec<String>>> {
    tracing::debug!("Listing all pipelines");

    let names = export_service::list_pipelines(&pool).await?;
    Ok(Json(names))
}

/// Requests without a version are taken to speak the current one
fn check_version(version: Option<u32>) -> ApiResult<()> {
    match version {
        Some(v) if v != PROTOCOL_VERSION => {
            tracing::warn!("Rejecting protocol version {} (server speaks {})", v, PROTOCOL_VERSION);
            Err(ApiError::VersionMismatch)
        }
        _ => Ok(()),
    }
}
