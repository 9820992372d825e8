//! Identity Resolver
//!
//! Decides whether an incoming entity matches one already present in the
//! target store. Resolution only reads; the merge engine performs any
//! create or update.

use cmf_core::domain::artifact::{Artifact, content_hash};
use cmf_core::domain::execution::{Execution, UuidSet};
use cmf_core::domain::pipeline::Pipeline;
use cmf_core::domain::stage::Stage;
use cmf_core::dto::document::ArtifactNode;
use sqlx::SqliteConnection;

use crate::error::{MetadataError, Result};
use crate::repository::{
    artifact_repository, execution_repository, pipeline_repository, stage_repository,
};

/// Outcome of resolving one entity
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// The stored entity the candidate is identical to
    Existing(T),
    /// No match; a new entity must be created
    NotFound,
}

impl<T> From<Option<T>> for Resolution<T> {
    fn from(found: Option<T>) -> Self {
        match found {
            Some(entity) => Resolution::Existing(entity),
            None => Resolution::NotFound,
        }
    }
}

/// Pipelines match on their exact name
pub async fn resolve_pipeline(conn: &mut SqliteConnection, name: &str) -> Result<Resolution<Pipeline>> {
    Ok(pipeline_repository::find_by_name(conn, name).await?.into())
}

/// Stages match on `(pipeline id, stage name)`
pub async fn resolve_stage(
    conn: &mut SqliteConnection,
    pipeline_id: i64,
    name: &str,
) -> Result<Resolution<Stage>> {
    Ok(stage_repository::find(conn, pipeline_id, name).await?.into())
}

/// Executions match when any incoming UUID is already recorded on an
/// execution of the same stage
pub async fn resolve_execution(
    conn: &mut SqliteConnection,
    stage_id: i64,
    uuids: &UuidSet,
) -> Result<Resolution<Execution>> {
    let existing = execution_repository::list_by_stage(conn, stage_id).await?;
    Ok(match_execution(existing, uuids))
}

/// Pick the execution sharing a UUID with `uuids`
///
/// If several do, the oldest wins.
pub fn match_execution(existing: Vec<Execution>, uuids: &UuidSet) -> Resolution<Execution> {
    let mut matches = existing.into_iter().filter(|e| e.uuids.intersects(uuids));

    let Some(first) = matches.next() else {
        return Resolution::NotFound;
    };

    let others: Vec<i64> = matches.map(|e| e.id).collect();
    if !others.is_empty() {
        tracing::warn!(
            execution_id = first.id,
            ?others,
            "UUIDs {} match several executions; using the oldest",
            uuids
        );
    }

    Resolution::Existing(first)
}

/// Artifacts match on `(name, uri)`
///
/// When both sides carry a content hash the hashes must agree; a mismatch is
/// reported as a conflict rather than resolved.
pub async fn resolve_artifact(
    conn: &mut SqliteConnection,
    candidate: &ArtifactNode,
) -> Result<Resolution<Artifact>> {
    let found = artifact_repository::find_by_name_and_uri(conn, &candidate.name, &candidate.uri).await?;

    match found {
        Some(existing) => {
            check_content_hash(&existing, candidate)?;
            Ok(Resolution::Existing(existing))
        }
        None => Ok(Resolution::NotFound),
    }
}

/// Fails if both artifacts carry a content hash and the hashes differ
pub fn check_content_hash(existing: &Artifact, candidate: &ArtifactNode) -> Result<()> {
    match (existing.content_hash(), content_hash(&candidate.properties)) {
        (Some(existing_hash), Some(incoming_hash)) if existing_hash != incoming_hash => {
            Err(MetadataError::ArtifactIdentityConflict {
                name: candidate.name.clone(),
                uri: candidate.uri.clone(),
                existing_hash: existing_hash.to_string(),
                incoming_hash: incoming_hash.to_string(),
            })
        }
        _ => Ok(()),
    }
}
