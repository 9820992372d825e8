//! Artifact domain types

use serde::{Deserialize, Serialize};

use crate::domain::properties::Properties;

/// Property key carrying an artifact's content hash
pub const CONTENT_HASH_PROPERTY: &str = "hash";

/// A named, URI-addressed data object
///
/// Identified by `(name, uri)`. Several executions may reference the same
/// artifact through distinct events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: i64,
    pub name: String,
    pub uri: String,
    pub artifact_type: String,
    pub properties: Properties,
}

impl Artifact {
    /// Content hash, when the artifact carries one
    pub fn content_hash(&self) -> Option<&str> {
        content_hash(&self.properties)
    }
}

/// Reads the content hash out of a property bag
pub fn content_hash(properties: &Properties) -> Option<&str> {
    properties
        .get(CONTENT_HASH_PROPERTY)
        .and_then(|value| value.as_str())
        .filter(|hash| !hash.is_empty())
}
