//! Merge summary DTOs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Created vs. matched counts for one entity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub created: usize,
    pub matched: usize,
}

/// Outcome of one merge call, per entity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub pipelines: EntityCounts,
    pub stages: EntityCounts,
    pub executions: EntityCounts,
    pub artifacts: EntityCounts,
    pub events: EntityCounts,
}

impl MergeSummary {
    /// Total number of nodes and edges created
    pub fn total_created(&self) -> usize {
        self.pipelines.created
            + self.stages.created
            + self.executions.created
            + self.artifacts.created
            + self.events.created
    }
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("pipelines", self.pipelines),
            ("stages", self.stages),
            ("executions", self.executions),
            ("artifacts", self.artifacts),
            ("events", self.events),
        ];
        let parts: Vec<String> = rows
            .iter()
            .map(|(kind, c)| format!("{}: {} created, {} matched", kind, c.created, c.matched))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
