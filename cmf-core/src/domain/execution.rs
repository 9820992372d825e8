//! Execution domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::properties::Properties;

/// Property key carrying the comma-joined execution UUIDs on the wire
pub const EXECUTION_UUID_PROPERTY: &str = "Execution_uuid";

/// One run of a stage, possibly re-invoked several times
///
/// Every re-invocation that reuses this execution (e.g. a cached re-run)
/// appends its UUID to `uuids` instead of creating a new execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: i64,
    pub stage_id: i64,
    pub execution_type: String,
    pub uuids: UuidSet,
    pub properties: Properties,
}

/// Insertion-ordered set of execution UUIDs
///
/// The set only ever grows. Its comma-joined form is produced and parsed
/// only at the store and document boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UuidSet(Vec<String>);

impl UuidSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses the comma-joined wire form
    ///
    /// Surrounding whitespace and empty segments are dropped, duplicates keep
    /// their first position.
    pub fn parse(joined: &str) -> Self {
        let mut set = Self::new();
        for uuid in joined.split(',') {
            set.insert(uuid);
        }
        set
    }

    /// Renders the comma-joined wire form
    pub fn to_joined(&self) -> String {
        self.0.join(",")
    }

    /// Adds a UUID, returning `true` if it was not present
    pub fn insert(&mut self, uuid: &str) -> bool {
        let uuid = uuid.trim();
        if uuid.is_empty() || self.contains(uuid) {
            return false;
        }
        self.0.push(uuid.to_string());
        true
    }

    /// Adds every UUID of `other`, returning `true` if the set grew
    pub fn extend(&mut self, other: &UuidSet) -> bool {
        let mut grew = false;
        for uuid in other.iter() {
            grew |= self.insert(uuid);
        }
        grew
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.0.iter().any(|u| u == uuid)
    }

    /// Returns `true` if any UUID is shared with `other`
    pub fn intersects(&self, other: &UuidSet) -> bool {
        other.iter().any(|u| self.contains(u))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UuidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_joined())
    }
}

impl<'a> FromIterator<&'a str> for UuidSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for uuid in iter {
            set.insert(uuid);
        }
        set
    }
}
