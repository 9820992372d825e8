//! Push/pull DTOs shared by the client and the aggregation server

use serde::{Deserialize, Serialize};

use crate::dto::document::MetadataDocument;

/// Version of the push/pull protocol spoken by this build
///
/// The server answers 422 to any other version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Body returned by the server when a pulled execution does not exist
pub const NO_EXECUTION_SENTINEL: &str = "no_exec_id";

/// Request body for pushing a pipeline subgraph to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    pub protocol_version: u32,
    pub pipeline_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_uuid: Option<String>,
    pub document: MetadataDocument,
}

/// Query parameters for pulling a pipeline subgraph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PullQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<u32>,
}

/// Body of a 409 answer: a pushed artifact matched a stored one by
/// `(name, uri)` but carries a different content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub name: String,
    pub uri: String,
    pub existing_hash: String,
    pub incoming_hash: String,
}
