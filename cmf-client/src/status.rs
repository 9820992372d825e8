//! Classification of server status codes

use std::fmt;

/// Typed meaning of an HTTP status returned by the aggregation server
///
/// Push and pull share one status contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// 200
    Success,
    /// 404: the remote service is not reachable behind its endpoint
    ServiceUnavailable,
    /// 406: the requested pipeline does not exist on the server
    PipelineNotFound,
    /// 409: a pushed artifact conflicts with a stored one; nothing was merged
    Conflict,
    /// 413: the server holds no metadata at all
    NoMetadata,
    /// 422: client and server speak different protocol versions
    VersionMismatch,
    /// 500
    InternalServerError,
    /// Any other status
    Unclassified(u16),
}

impl TransferStatus {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => TransferStatus::Success,
            404 => TransferStatus::ServiceUnavailable,
            406 => TransferStatus::PipelineNotFound,
            409 => TransferStatus::Conflict,
            413 => TransferStatus::NoMetadata,
            422 => TransferStatus::VersionMismatch,
            500 => TransferStatus::InternalServerError,
            other => TransferStatus::Unclassified(other),
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransferStatus::ServiceUnavailable | TransferStatus::InternalServerError
        )
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::Success => write!(f, "success"),
            TransferStatus::ServiceUnavailable => write!(f, "server not available"),
            TransferStatus::PipelineNotFound => write!(f, "pipeline not found"),
            TransferStatus::Conflict => write!(f, "artifact identity conflict"),
            TransferStatus::NoMetadata => write!(f, "no metadata available"),
            TransferStatus::VersionMismatch => write!(f, "protocol version mismatch"),
            TransferStatus::InternalServerError => write!(f, "internal server error"),
            TransferStatus::Unclassified(code) => write!(f, "unexpected status {}", code),
        }
    }
}
