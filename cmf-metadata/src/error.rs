//! Engine error type
//!
//! Every failure a push, pull or merge can report maps to exactly one variant.

use std::path::PathBuf;

use cmf_client::ClientError;
use cmf_core::dto::document::DocumentError;
use cmf_core::dto::transfer::ConflictReport;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetadataError>;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Pipeline '{0}' not found")]
    PipelineNotFound(String),

    #[error("Execution UUID '{0}' not found")]
    ExecutionUuidNotFound(String),

    #[error(
        "Artifact '{name}' ({uri}) already exists with content hash '{existing_hash}', incoming hash is '{incoming_hash}'"
    )]
    ArtifactIdentityConflict {
        name: String,
        uri: String,
        existing_hash: String,
        incoming_hash: String,
    },

    #[error("Malformed metadata document: {0}")]
    MalformedDocument(String),

    /// Connection refused, reset or timed out
    #[error("Transport error, retry later: {0}")]
    TransientTransport(String),

    #[error("Client and server protocol versions differ; upgrade the client")]
    ProtocolVersionMismatch,

    /// 404 from the server endpoint
    #[error("CMF server is not available")]
    ServerUnavailable,

    #[error("CMF server reported an internal error")]
    InternalServerError,

    #[error("No metadata available on the CMF server")]
    NoMetadataOnServer,

    #[error("CMF server answered with unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Target store is locked by another writer or cannot be reached
    #[error("Metadata store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Metadata store not found at {}", .0.display())]
    StoreNotFound(PathBuf),

    /// The file exists but does not hold a metadata store schema
    #[error("{} is not a metadata store (missing tables: {missing})", .path.display())]
    IncompatibleStore { path: PathBuf, missing: String },

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl MetadataError {
    /// Whether the whole operation may simply be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MetadataError::TransientTransport(_)
                | MetadataError::ServerUnavailable
                | MetadataError::InternalServerError
                | MetadataError::StoreUnavailable(_)
        )
    }
}

impl From<DocumentError> for MetadataError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Malformed(msg) => MetadataError::MalformedDocument(msg),
            DocumentError::ExecutionUuidNotFound(uuid) => MetadataError::ExecutionUuidNotFound(uuid),
        }
    }
}

impl From<ConflictReport> for MetadataError {
    fn from(report: ConflictReport) -> Self {
        MetadataError::ArtifactIdentityConflict {
            name: report.name,
            uri: report.uri,
            existing_hash: report.existing_hash,
            incoming_hash: report.incoming_hash,
        }
    }
}

impl From<ClientError> for MetadataError {
    fn from(err: ClientError) -> Self {
        if err.is_timeout() {
            return MetadataError::TransientTransport(format!("request timed out: {}", err));
        }

        match err {
            ClientError::RequestFailed(e) => MetadataError::TransientTransport(e.to_string()),
            ClientError::InvalidRequest(msg) => MetadataError::InvalidArgument(msg),
        }
    }
}

impl From<sqlx::Error> for MetadataError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                MetadataError::StoreUnavailable(err.to_string())
            }
            sqlx::Error::Database(db) if is_lock_error(db.code().as_deref()) => {
                MetadataError::StoreUnavailable(db.message().to_string())
            }
            _ => MetadataError::Database(err),
        }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes
fn is_lock_error(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .is_some_and(|c| matches!(c & 0xff, 5 | 6))
}
