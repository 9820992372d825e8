//! Pipeline domain types

use serde::{Deserialize, Serialize};

use crate::domain::properties::Properties;

/// Top-level named unit of tracked ML work
///
/// Pipeline names are unique within a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: i64,
    pub name: String,
    pub properties: Properties,
}
