//! Builders and store helpers shared by the unit tests

use cmf_core::domain::event::EventDirection;
use cmf_core::domain::execution::UuidSet;
use cmf_core::domain::properties::{Properties, PropertyValue};
use cmf_core::dto::document::{
    ArtifactNode, EventNode, ExecutionNode, MetadataDocument, PipelineNode, StageNode,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::db;

pub fn artifact(name: &str, uri: &str, hash: Option<&str>) -> ArtifactNode {
    let mut properties = Properties::new();
    if let Some(hash) = hash {
        properties.insert("hash".to_string(), PropertyValue::from(hash));
    }

    ArtifactNode {
        id: None,
        name: name.to_string(),
        uri: uri.to_string(),
        artifact_type: "Dataset".to_string(),
        properties,
    }
}

pub fn input(artifact: ArtifactNode) -> EventNode {
    EventNode {
        direction: EventDirection::Input,
        milliseconds_since_epoch: Some(1_700_000_000_000),
        artifact,
    }
}

pub fn output(artifact: ArtifactNode) -> EventNode {
    EventNode {
        direction: EventDirection::Output,
        milliseconds_since_epoch: Some(1_700_000_001_000),
        artifact,
    }
}

pub fn execution(uuids: &str, events: Vec<EventNode>) -> ExecutionNode {
    ExecutionNode {
        id: None,
        execution_type: "Step".to_string(),
        uuids: UuidSet::parse(uuids),
        properties: Properties::new(),
        events,
    }
}

pub fn document(pipeline: &str, stages: Vec<(&str, Vec<ExecutionNode>)>) -> MetadataDocument {
    MetadataDocument::new(PipelineNode {
        name: pipeline.to_string(),
        properties: Properties::new(),
        stages: stages
            .into_iter()
            .map(|(name, executions)| StageNode {
                name: name.to_string(),
                properties: Properties::new(),
                executions,
            })
            .collect(),
    })
}

/// Two-stage pipeline `mnist`: `prepare` (u-prep) writes train.csv, which
/// `train` (u-train) reads to produce model.pkl
pub fn training_document() -> MetadataDocument {
    let raw = artifact("raw.csv", "/data/raw.csv", Some("r1"));
    let train_csv = artifact("train.csv", "/data/train.csv", Some("t1"));
    let model = artifact("model.pkl", "/models/model.pkl", None);

    document(
        "mnist",
        vec![
            ("prepare", vec![execution("u-prep", vec![input(raw), output(train_csv.clone())])]),
            ("train", vec![execution("u-train", vec![input(train_csv), output(model)])]),
        ],
    )
}

pub async fn temp_store() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::open_store(&dir.path().join("mlmd")).await.unwrap();
    (dir, pool)
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    sqlx::query_scalar(&sql)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Row counts of pipelines, stages, executions, artifacts and events
pub async fn table_counts(pool: &SqlitePool) -> [i64; 5] {
    [
        count(pool, "pipelines").await,
        count(pool, "stages").await,
        count(pool, "executions").await,
        count(pool, "artifacts").await,
        count(pool, "events").await,
    ]
}

pub async fn stored_uuids(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar("SELECT uuids FROM executions ORDER BY id")
        .fetch_all(pool)
        .await
        .unwrap()
}
