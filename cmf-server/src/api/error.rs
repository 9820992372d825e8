//! API Error Handling
//!
//! Maps engine errors onto the status codes clients classify.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cmf_core::dto::transfer::ConflictReport;
use cmf_metadata::MetadataError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// 400: body or parameters unusable
    BadRequest(String),
    /// 406
    PipelineNotFound(String),
    /// 409: artifact identity conflict, nothing was merged
    Conflict(ConflictReport),
    /// 413: the store holds no pipelines at all
    NoMetadata,
    /// 422
    VersionMismatch,
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::VersionMismatch => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(serde_json::json!({ "status": "version_update" })),
                )
                    .into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PipelineNotFound(name) => (
                StatusCode::NOT_ACCEPTABLE,
                format!("Pipeline '{}' not found", name),
            ),
            ApiError::Conflict(report) => {
                let message = format!(
                    "Artifact '{}' ({}) is stored with hash '{}', pushed with '{}'",
                    report.name, report.uri, report.existing_hash, report.incoming_hash
                );
                return (
                    StatusCode::CONFLICT,
                    Json(serde_json::json!({
                        "error": message,
                        "name": report.name,
                        "uri": report.uri,
                        "existing_hash": report.existing_hash,
                        "incoming_hash": report.incoming_hash,
                    })),
                )
                    .into_response();
            }
            ApiError::NoMetadata => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "No metadata available".to_string(),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<MetadataError> for ApiError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::PipelineNotFound(name) => ApiError::PipelineNotFound(name),
            MetadataError::ArtifactIdentityConflict {
                name,
                uri,
                existing_hash,
                incoming_hash,
            } => ApiError::Conflict(ConflictReport {
                name,
                uri,
                existing_hash,
                incoming_hash,
            }),
            MetadataError::MalformedDocument(_)
            | MetadataError::ExecutionUuidNotFound(_)
            | MetadataError::InvalidArgument(_) => ApiError::BadRequest(err.to_string()),
            MetadataError::ProtocolVersionMismatch => ApiError::VersionMismatch,
            MetadataError::NoMetadataOnServer => ApiError::NoMetadata,
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
