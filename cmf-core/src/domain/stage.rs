//! Stage domain types

use serde::{Deserialize, Serialize};

use crate::domain::properties::Properties;

/// A named phase within a pipeline
///
/// Identified by `(pipeline_id, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: i64,
    pub pipeline_id: i64,
    pub name: String,
    pub properties: Properties,
}
