//! Hierarchical metadata document
//!
//! The wire/file form of a pipeline subgraph:
//!
//! ```json
//! { "Pipeline": [ { "name": "...", "stages": [
//!     { "name": "...", "executions": [
//!         { "id": 1, "type": "Train",
//!           "properties": { "Execution_uuid": "u1,u2" },
//!           "events": [ { "type": "OUTPUT", "artifact": {
//!               "name": "model.pkl", "uri": "/m/1", "type": "Model",
//!               "properties": {} } } ] } ] } ] } ] }
//! ```
//!
//! Required identity fields are checked while parsing, so a document that
//! reaches the merge engine is always well-formed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::event::EventDirection;
use crate::domain::execution::{EXECUTION_UUID_PROPERTY, UuidSet};
use crate::domain::properties::{Properties, PropertyValue};

/// Errors raised while parsing or scoping a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Missing or invalid identity fields
    #[error("Malformed metadata document: {0}")]
    Malformed(String),

    /// No execution in the document carries the requested UUID
    #[error("Execution UUID '{0}' not found")]
    ExecutionUuidNotFound(String),
}

/// Portion of a pipeline selected for a merge or transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeScope {
    FullPipeline,
    SingleExecution(String),
}

impl MergeScope {
    pub fn from_execution_uuid(uuid: Option<&str>) -> Self {
        match uuid {
            Some(uuid) => MergeScope::SingleExecution(uuid.trim().to_string()),
            None => MergeScope::FullPipeline,
        }
    }

    pub fn execution_uuid(&self) -> Option<&str> {
        match self {
            MergeScope::FullPipeline => None,
            MergeScope::SingleExecution(uuid) => Some(uuid),
        }
    }
}

/// Root of the document; holds exactly one pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(rename = "Pipeline")]
    pub pipelines: Vec<PipelineNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    #[serde(default)]
    pub stages: Vec<StageNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    #[serde(default)]
    pub executions: Vec<ExecutionNode>,
}

/// An execution as carried in a document
///
/// On the wire the UUIDs live in the `Execution_uuid` property as a
/// comma-joined string; here they are lifted out into `uuids` and the
/// property is absent from `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExecution", into = "RawExecution")]
pub struct ExecutionNode {
    /// Id in the store the document was exported from; never used for identity
    pub id: Option<i64>,
    pub execution_type: String,
    pub uuids: UuidSet,
    pub properties: Properties,
    pub events: Vec<EventNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNode {
    #[serde(rename = "type")]
    pub direction: EventDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milliseconds_since_epoch: Option<i64>,
    pub artifact: ArtifactNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Serialize, Deserialize)]
struct RawExecution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(rename = "type")]
    execution_type: String,
    #[serde(default)]
    properties: Properties,
    #[serde(default)]
    events: Vec<EventNode>,
}

impl TryFrom<RawExecution> for ExecutionNode {
    type Error = String;

    fn try_from(mut raw: RawExecution) -> Result<Self, Self::Error> {
        let joined = match raw.properties.remove(EXECUTION_UUID_PROPERTY) {
            Some(PropertyValue::String(joined)) => joined,
            Some(other) => {
                return Err(format!(
                    "{} must be a string, found '{}'",
                    EXECUTION_UUID_PROPERTY, other
                ));
            }
            None => {
                return Err(format!(
                    "execution of type '{}' has no {} property",
                    raw.execution_type, EXECUTION_UUID_PROPERTY
                ));
            }
        };

        let uuids = UuidSet::parse(&joined);
        if uuids.is_empty() {
            return Err(format!(
                "execution of type '{}' has an empty {}",
                raw.execution_type, EXECUTION_UUID_PROPERTY
            ));
        }

        Ok(ExecutionNode {
            id: raw.id,
            execution_type: raw.execution_type,
            uuids,
            properties: raw.properties,
            events: raw.events,
        })
    }
}

impl From<ExecutionNode> for RawExecution {
    fn from(node: ExecutionNode) -> Self {
        let mut properties = node.properties;
        properties.insert(
            EXECUTION_UUID_PROPERTY.to_string(),
            PropertyValue::String(node.uuids.to_joined()),
        );

        RawExecution {
            id: node.id,
            execution_type: node.execution_type,
            properties,
            events: node.events,
        }
    }
}

impl MetadataDocument {
    pub fn new(pipeline: PipelineNode) -> Self {
        Self {
            pipelines: vec![pipeline],
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Self::from_slice(json.as_bytes())
    }

    /// Parse and validate a JSON document from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        let document: Self = serde_json::from_slice(bytes)
            .map_err(|e| DocumentError::Malformed(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string(self).map_err(|e| DocumentError::Malformed(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::Malformed(e.to_string()))
    }

    /// The single pipeline this document describes
    pub fn pipeline(&self) -> Result<&PipelineNode, DocumentError> {
        match self.pipelines.as_slice() {
            [pipeline] => Ok(pipeline),
            other => Err(DocumentError::Malformed(format!(
                "expected exactly one pipeline, found {}",
                other.len()
            ))),
        }
    }

    /// Check every required identity field
    pub fn validate(&self) -> Result<(), DocumentError> {
        let pipeline = self.pipeline()?;
        require(&pipeline.name, || "pipeline has an empty name".to_string())?;

        for stage in &pipeline.stages {
            require(&stage.name, || {
                format!("stage in pipeline '{}' has an empty name", pipeline.name)
            })?;

            for execution in &stage.executions {
                if execution.uuids.is_empty() {
                    return Err(DocumentError::Malformed(format!(
                        "execution in stage '{}' has no {}",
                        stage.name, EXECUTION_UUID_PROPERTY
                    )));
                }
                require(&execution.execution_type, || {
                    format!("execution {} has an empty type", execution.uuids)
                })?;

                for event in &execution.events {
                    let artifact = &event.artifact;
                    require(&artifact.name, || {
                        format!("artifact of execution {} has an empty name", execution.uuids)
                    })?;
                    require(&artifact.uri, || {
                        format!("artifact '{}' has an empty uri", artifact.name)
                    })?;
                    require(&artifact.artifact_type, || {
                        format!("artifact '{}' has an empty type", artifact.name)
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Returns `true` if some execution's UUID set contains `uuid`
    pub fn contains_execution(&self, uuid: &str) -> bool {
        self.pipelines
            .iter()
            .flat_map(|p| &p.stages)
            .flat_map(|s| &s.executions)
            .any(|e| e.uuids.contains(uuid))
    }

    /// Validate the document and prune it to `scope`
    ///
    /// For a single execution only the stage/execution path carrying that
    /// UUID survives, together with the artifacts its events reference.
    pub fn scoped(&self, scope: &MergeScope) -> Result<PipelineNode, DocumentError> {
        self.validate()?;
        let pipeline = self.pipeline()?;

        let uuid = match scope {
            MergeScope::FullPipeline => return Ok(pipeline.clone()),
            MergeScope::SingleExecution(uuid) => uuid.trim(),
        };

        let stages: Vec<StageNode> = pipeline
            .stages
            .iter()
            .filter_map(|stage| {
                let executions: Vec<ExecutionNode> = stage
                    .executions
                    .iter()
                    .filter(|e| e.uuids.contains(uuid))
                    .cloned()
                    .collect();

                (!executions.is_empty()).then(|| StageNode {
                    name: stage.name.clone(),
                    properties: stage.properties.clone(),
                    executions,
                })
            })
            .collect();

        if stages.is_empty() {
            return Err(DocumentError::ExecutionUuidNotFound(uuid.to_string()));
        }

        Ok(PipelineNode {
            name: pipeline.name.clone(),
            properties: pipeline.properties.clone(),
            stages,
        })
    }
}

fn require(value: &str, message: impl FnOnce() -> String) -> Result<(), DocumentError> {
    if value.trim().is_empty() {
        return Err(DocumentError::Malformed(message()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "Pipeline": [{
            "name": "p",
            "stages": [
                {
                    "name": "prepare",
                    "executions": [{
                        "id": 1,
                        "type": "Prepare",
                        "properties": {"Execution_uuid": "u1", "seed": 42},
                        "events": [
                            {"type": "INPUT", "milliseconds_since_epoch": 1700000000000,
                             "artifact": {"name": "raw.csv", "uri": "/d/raw", "type": "Dataset",
                                          "properties": {"hash": "aa"}}},
                            {"type": "OUTPUT",
                             "artifact": {"name": "train.csv", "uri": "/d/train", "type": "Dataset"}}
                        ]
                    }]
                },
                {
                    "name": "train",
                    "executions": [
                        {"type": "Train", "properties": {"Execution_uuid": "u2,u4"},
                         "events": [{"type": "OUTPUT",
                                     "artifact": {"name": "model.pkl", "uri": "/m/1", "type": "Model"}}]},
                        {"type": "Train", "properties": {"Execution_uuid": "u3"}, "events": []}
                    ]
                }
            ]
        }]
    }"#;

    #[test]
    fn test_parse_document() {
        let document = MetadataDocument::from_json(DOCUMENT).unwrap();
        let pipeline = document.pipeline().unwrap();

        assert_eq!(pipeline.name, "p");
        assert_eq!(pipeline.stages.len(), 2);

        let prepare = &pipeline.stages[0].executions[0];
        assert_eq!(prepare.id, Some(1));
        assert_eq!(prepare.uuids.to_joined(), "u1");
        assert!(!prepare.properties.contains_key(EXECUTION_UUID_PROPERTY));
        assert_eq!(prepare.properties["seed"], PropertyValue::Int(42));
        assert_eq!(prepare.events[0].direction, EventDirection::Input);
        assert_eq!(prepare.events[0].milliseconds_since_epoch, Some(1700000000000));

        let train = &pipeline.stages[1].executions[0];
        assert!(train.uuids.contains("u4"));
    }

    #[test]
    fn test_serialize_restores_joined_uuids() {
        let document = MetadataDocument::from_json(DOCUMENT).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&document.to_json().unwrap()).unwrap();

        assert_eq!(
            value["Pipeline"][0]["stages"][1]["executions"][0]["properties"]["Execution_uuid"],
            "u2,u4"
        );

        let reparsed = MetadataDocument::from_json(&document.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, document);
    }

    #[test]
    fn test_missing_execution_uuid_is_malformed() {
        let json = r#"{"Pipeline": [{"name": "p", "stages": [{"name": "s",
            "executions": [{"type": "T", "properties": {}}]}]}]}"#;

        assert!(matches!(
            MetadataDocument::from_json(json),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_string_execution_uuid_is_malformed() {
        let json = r#"{"Pipeline": [{"name": "p", "stages": [{"name": "s",
            "executions": [{"type": "T", "properties": {"Execution_uuid": 5}}]}]}]}"#;

        assert!(matches!(
            MetadataDocument::from_json(json),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_pipeline_name_is_malformed() {
        let json = r#"{"Pipeline": [{"stages": []}]}"#;
        assert!(matches!(
            MetadataDocument::from_json(json),
            Err(DocumentError::Malformed(_))
        ));

        let json = r#"{"Pipeline": [{"name": "  ", "stages": []}]}"#;
        assert!(matches!(
            MetadataDocument::from_json(json),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_artifact_without_uri_is_malformed() {
        let json = r#"{"Pipeline": [{"name": "p", "stages": [{"name": "s",
            "executions": [{"type": "T", "properties": {"Execution_uuid": "u1"},
            "events": [{"type": "INPUT", "artifact": {"name": "a", "type": "Dataset"}}]}]}]}]}"#;

        assert!(matches!(
            MetadataDocument::from_json(json),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_pipeline_count_must_be_one() {
        assert!(MetadataDocument::from_json(r#"{"Pipeline": []}"#).is_err());
        assert!(
            MetadataDocument::from_json(r#"{"Pipeline": [{"name": "a"}, {"name": "b"}]}"#)
                .is_err()
        );
    }

    #[test]
    fn test_scoped_full_pipeline() {
        let document = MetadataDocument::from_json(DOCUMENT).unwrap();
        let pipeline = document.scoped(&MergeScope::FullPipeline).unwrap();
        assert_eq!(&pipeline, document.pipeline().unwrap());
    }

    #[test]
    fn test_scoped_single_execution() {
        let document = MetadataDocument::from_json(DOCUMENT).unwrap();
        let scope = MergeScope::SingleExecution("u4".to_string());
        let pipeline = document.scoped(&scope).unwrap();

        assert_eq!(pipeline.stages.len(), 1);
        assert_eq!(pipeline.stages[0].name, "train");
        assert_eq!(pipeline.stages[0].executions.len(), 1);
        assert_eq!(pipeline.stages[0].executions[0].uuids.to_joined(), "u2,u4");
        assert_eq!(
            pipeline.stages[0].executions[0].events[0].artifact.name,
            "model.pkl"
        );
    }

    #[test]
    fn test_scoped_unknown_execution() {
        let document = MetadataDocument::from_json(DOCUMENT).unwrap();
        let scope = MergeScope::from_execution_uuid(Some("uX"));

        assert_eq!(
            document.scoped(&scope),
            Err(DocumentError::ExecutionUuidNotFound("uX".to_string()))
        );
        assert!(!document.contains_execution("uX"));
        assert!(document.contains_execution("u3"));
    }
}
