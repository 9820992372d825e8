//! Event domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A typed link between an execution and an artifact
///
/// Identified by `(execution_id, artifact_id, direction)` and immutable once
/// created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub execution_id: i64,
    pub artifact_id: i64,
    pub direction: EventDirection,
    pub timestamp: DateTime<Utc>,
}

/// Whether the execution consumed or produced the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventDirection {
    Input,
    Output,
}

impl EventDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventDirection::Input => "INPUT",
            EventDirection::Output => "OUTPUT",
        }
    }
}

impl fmt::Display for EventDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INPUT" => Ok(EventDirection::Input),
            "OUTPUT" => Ok(EventDirection::Output),
            other => Err(format!("unknown event direction '{}'", other)),
        }
    }
}
