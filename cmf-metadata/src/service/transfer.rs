//! Transfer Coordinator
//!
//! Push sends a subgraph of the local store to the aggregation server; pull
//! fetches one from the server and merges it into a local store. Each call is
//! one network round trip plus at most one local merge, with no state kept in
//! between, so a failed call can simply be repeated.

use std::path::{Path, PathBuf};

use cmf_client::{MetadataTransport, ServerClient, TransferStatus, TransportResponse};
use cmf_core::dto::document::{MergeScope, MetadataDocument};
use cmf_core::dto::summary::MergeSummary;
use cmf_core::dto::transfer::{ConflictReport, NO_EXECUTION_SENTINEL, PushRequest};

use crate::config::TransferConfig;
use crate::db;
use crate::error::{MetadataError, Result};
use crate::service::{export_service, merge_service};

/// Outcome of a successful push or pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    Pushed {
        pipeline: String,
        execution_uuid: Option<String>,
        /// What the server merged, when it reported it
        summary: Option<MergeSummary>,
    },
    Pulled {
        pipeline: String,
        execution_uuid: Option<String>,
        destination: PathBuf,
        summary: MergeSummary,
    },
}

pub struct TransferCoordinator<T = ServerClient> {
    config: TransferConfig,
    transport: T,
}

impl TransferCoordinator<ServerClient> {
    /// Coordinator talking HTTP to `config.server_url`
    pub fn from_config(config: TransferConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MetadataError::InvalidArgument(format!("cannot build HTTP client: {}", e)))?;

        let transport = ServerClient::with_client(config.server_url.clone(), client);
        Ok(Self::new(config, transport))
    }
}

impl<T: MetadataTransport> TransferCoordinator<T> {
    pub fn new(config: TransferConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Send `pipeline_name` (or one execution of it) from the local store
    ///
    /// The local store is only read. Everything that can be checked locally
    /// is checked before the network call.
    pub async fn push(&self, pipeline_name: &str, execution_uuid: Option<&str>) -> Result<TransferResult> {
        require_pipeline_name(pipeline_name)?;
        let scope = parse_scope(execution_uuid)?;

        let pool = db::open_existing_store(&self.config.local_store_path).await?;
        let exported = export_service::export_pipeline(&pool, pipeline_name, &scope).await;
        pool.close().await;
        let document = exported?;

        let request = PushRequest {
            protocol_version: self.config.protocol_version,
            pipeline_name: pipeline_name.to_string(),
            execution_uuid: scope.execution_uuid().map(str::to_string),
            document,
        };

        let response = self.transport.send_subgraph(&request).await?;
        check_status(&response, pipeline_name)?;

        let summary = serde_json::from_str::<MergeSummary>(&response.body).ok();

        tracing::info!(
            pipeline = %pipeline_name,
            execution = ?scope.execution_uuid(),
            "Metadata pushed"
        );

        Ok(TransferResult::Pushed {
            pipeline: pipeline_name.to_string(),
            execution_uuid: request.execution_uuid,
            summary,
        })
    }

    /// Fetch `pipeline_name` (or one execution of it) and merge it into the
    /// store at `destination`
    ///
    /// The store is created if missing, but only once a complete and valid
    /// document has been received.
    pub async fn pull(
        &self,
        pipeline_name: &str,
        execution_uuid: Option<&str>,
        destination: &Path,
    ) -> Result<TransferResult> {
        require_pipeline_name(pipeline_name)?;
        let scope = parse_scope(execution_uuid)?;
        validate_destination(destination)?;

        let response = self
            .transport
            .fetch_subgraph(pipeline_name, scope.execution_uuid())
            .await?;

        // The server answers 200 with this body when the execution is absent
        if response.body.trim() == NO_EXECUTION_SENTINEL {
            return Err(MetadataError::ExecutionUuidNotFound(
                scope.execution_uuid().unwrap_or_default().to_string(),
            ));
        }
        check_status(&response, pipeline_name)?;

        let document = MetadataDocument::from_json(&response.body)?;
        let received = document.pipeline()?;
        if received.name != pipeline_name {
            return Err(MetadataError::MalformedDocument(format!(
                "requested pipeline '{}' but received '{}'",
                pipeline_name, received.name
            )));
        }
        document.scoped(&scope)?;

        let pool = db::open_store(destination).await?;
        let merged = merge_service::merge_document(&pool, &document, &scope).await;
        pool.close().await;
        let summary = merged?;

        tracing::info!(
            pipeline = %pipeline_name,
            destination = %destination.display(),
            "Metadata pulled"
        );

        Ok(TransferResult::Pulled {
            pipeline: pipeline_name.to_string(),
            execution_uuid: scope.execution_uuid().map(str::to_string),
            destination: destination.to_path_buf(),
            summary,
        })
    }
}

fn require_pipeline_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MetadataError::InvalidArgument(
            "pipeline name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// A given execution UUID must name exactly one execution
fn parse_scope(execution_uuid: Option<&str>) -> Result<MergeScope> {
    match execution_uuid.map(str::trim) {
        Some("") => Err(MetadataError::InvalidArgument(
            "execution UUID must not be empty".to_string(),
        )),
        Some(uuid) if uuid.contains(',') => Err(MetadataError::InvalidArgument(format!(
            "expected a single execution UUID, got '{}'",
            uuid
        ))),
        uuid => Ok(MergeScope::from_execution_uuid(uuid)),
    }
}

fn validate_destination(destination: &Path) -> Result<()> {
    if destination.is_dir() {
        return Err(MetadataError::InvalidDestination(format!(
            "{} is a directory",
            destination.display()
        )));
    }

    let parent = destination.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        if !parent.is_dir() {
            return Err(MetadataError::InvalidDestination(format!(
                "directory {} does not exist",
                parent.display()
            )));
        }
    }

    Ok(())
}

fn check_status(response: &TransportResponse, pipeline_name: &str) -> Result<()> {
    let status = response.status();

    let err = match status {
        TransferStatus::Success => return Ok(()),
        TransferStatus::ServiceUnavailable => MetadataError::ServerUnavailable,
        TransferStatus::PipelineNotFound => MetadataError::PipelineNotFound(pipeline_name.to_string()),
        TransferStatus::Conflict => match serde_json::from_str::<ConflictReport>(&response.body) {
            Ok(report) => report.into(),
            Err(_) => unexpected_status(response),
        },
        TransferStatus::NoMetadata => MetadataError::NoMetadataOnServer,
        TransferStatus::VersionMismatch => MetadataError::ProtocolVersionMismatch,
        TransferStatus::InternalServerError => MetadataError::InternalServerError,
        TransferStatus::Unclassified(_) => unexpected_status(response),
    };

    tracing::warn!(
        status = response.status_code,
        retryable = status.is_retryable(),
        "Server refused transfer of {}: {}",
        pipeline_name,
        status
    );

    Err(err)
}

fn unexpected_status(response: &TransportResponse) -> MetadataError {
    MetadataError::UnexpectedStatus {
        status: response.status_code,
        body: response.body.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::merge_service::merge_document;
    use crate::test_support::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Answers every call with a fixed response and records what it was sent
    struct StubTransport {
        response: TransportResponse,
        pushed: Mutex<Vec<PushRequest>>,
        fetched: Mutex<Vec<(String, Option<String>)>>,
    }

    impl StubTransport {
        fn new(status_code: u16, body: impl Into<String>) -> Self {
            Self {
                response: TransportResponse::new(status_code, body),
                pushed: Mutex::new(Vec::new()),
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn serving(document: &MetadataDocument) -> Self {
            Self::new(200, document.to_json().unwrap())
        }

        fn calls(&self) -> usize {
            self.pushed.lock().unwrap().len() + self.fetched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MetadataTransport for StubTransport {
        async fn send_subgraph(&self, request: &PushRequest) -> cmf_client::Result<TransportResponse> {
            self.pushed.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }

        async fn fetch_subgraph(
            &self,
            pipeline_name: &str,
            execution_uuid: Option<&str>,
        ) -> cmf_client::Result<TransportResponse> {
            self.fetched
                .lock()
                .unwrap()
                .push((pipeline_name.to_string(), execution_uuid.map(str::to_string)));
            Ok(self.response.clone())
        }
    }

    /// Local store at `<dir>/mlmd` holding the training pipeline
    async fn local_store() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mlmd");

        let pool = db::open_store(&path).await.unwrap();
        merge_document(&pool, &training_document(), &MergeScope::FullPipeline)
            .await
            .unwrap();
        pool.close().await;

        (dir, path)
    }

    fn stub_coordinator(store: &Path, transport: StubTransport) -> TransferCoordinator<StubTransport> {
        let config = TransferConfig::new("http://cmf.test").with_local_store(store);
        TransferCoordinator::new(config, transport)
    }

    async fn pulled_counts(path: &Path) -> [i64; 5] {
        let pool = db::open_existing_store(path).await.unwrap();
        let counts = table_counts(&pool).await;
        pool.close().await;
        counts
    }

    #[tokio::test]
    async fn test_push_sends_exported_pipeline() {
        let (_dir, store) = local_store().await;
        let body = serde_json::to_string(&MergeSummary::default()).unwrap();
        let coordinator = stub_coordinator(&store, StubTransport::new(200, body));

        let result = coordinator.push("mnist", None).await.unwrap();

        assert_eq!(
            result,
            TransferResult::Pushed {
                pipeline: "mnist".to_string(),
                execution_uuid: None,
                summary: Some(MergeSummary::default()),
            }
        );

        let pushed = coordinator.transport.pushed.lock().unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].pipeline_name, "mnist");
        assert_eq!(pushed[0].protocol_version, 1);
        assert_eq!(pushed[0].document.pipelines[0].stages.len(), 2);
    }

    #[tokio::test]
    async fn test_push_single_execution() {
        let (_dir, store) = local_store().await;
        let coordinator = stub_coordinator(&store, StubTransport::new(200, "ok"));

        let result = coordinator.push("mnist", Some("u-train")).await.unwrap();
        assert!(matches!(
            result,
            TransferResult::Pushed { execution_uuid: Some(ref uuid), summary: None, .. } if uuid == "u-train"
        ));

        let pushed = coordinator.transport.pushed.lock().unwrap();
        let stages = &pushed[0].document.pipelines[0].stages;
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].name, "train");
        assert_eq!(pushed[0].execution_uuid.as_deref(), Some("u-train"));
    }

    #[tokio::test]
    async fn test_push_does_not_modify_local_store() {
        let (_dir, store) = local_store().await;
        let before = pulled_counts(&store).await;

        let coordinator = stub_coordinator(&store, StubTransport::new(500, "boom"));
        let err = coordinator.push("mnist", None).await.unwrap_err();

        assert!(matches!(err, MetadataError::InternalServerError));
        assert!(err.is_retryable());
        assert_eq!(pulled_counts(&store).await, before);
    }

    #[tokio::test]
    async fn test_push_status_mapping() {
        let (_dir, store) = local_store().await;

        let cases: [(u16, fn(&MetadataError) -> bool); 6] = [
            (404, |e| matches!(e, MetadataError::ServerUnavailable)),
            (406, |e| matches!(e, MetadataError::PipelineNotFound(p) if p == "mnist")),
            (413, |e| matches!(e, MetadataError::NoMetadataOnServer)),
            (422, |e| matches!(e, MetadataError::ProtocolVersionMismatch)),
            (500, |e| matches!(e, MetadataError::InternalServerError)),
            // A 409 without a conflict report stays unclassified
            (409, |e| matches!(e, MetadataError::UnexpectedStatus { status: 409, body } if body == "conflict")),
        ];

        for (status, expected) in cases {
            let coordinator = stub_coordinator(&store, StubTransport::new(status, "conflict"));
            let err = coordinator.push("mnist", None).await.unwrap_err();
            assert!(expected(&err), "status {} gave {:?}", status, err);
        }
    }

    #[tokio::test]
    async fn test_push_conflict_is_decoded() {
        let (_dir, store) = local_store().await;
        let body = serde_json::json!({
            "error": "Artifact 'model.pkl' (/models/model.pkl) is stored with hash 'aa', pushed with 'bb'",
            "name": "model.pkl",
            "uri": "/models/model.pkl",
            "existing_hash": "aa",
            "incoming_hash": "bb",
        });
        let coordinator = stub_coordinator(&store, StubTransport::new(409, body.to_string()));

        let err = coordinator.push("mnist", None).await.unwrap_err();

        assert!(matches!(
            err,
            MetadataError::ArtifactIdentityConflict { ref name, ref existing_hash, ref incoming_hash, .. }
                if name == "model.pkl" && existing_hash == "aa" && incoming_hash == "bb"
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_push_rejects_bad_arguments_before_network() {
        let (_dir, store) = local_store().await;
        let coordinator = stub_coordinator(&store, StubTransport::new(200, ""));

        let err = coordinator.push("mnist", Some("  ")).await.unwrap_err();
        assert!(matches!(err, MetadataError::InvalidArgument(_)));

        let err = coordinator.push("mnist", Some("u1,u2")).await.unwrap_err();
        assert!(matches!(err, MetadataError::InvalidArgument(_)));

        let err = coordinator.push("", None).await.unwrap_err();
        assert!(matches!(err, MetadataError::InvalidArgument(_)));

        let err = coordinator.push("ghost", None).await.unwrap_err();
        assert!(matches!(err, MetadataError::PipelineNotFound(_)));

        let err = coordinator.push("mnist", Some("uX")).await.unwrap_err();
        assert!(matches!(err, MetadataError::ExecutionUuidNotFound(uuid) if uuid == "uX"));

        assert_eq!(coordinator.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_push_requires_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("mlmd");
        let coordinator = stub_coordinator(&store, StubTransport::new(200, ""));

        let err = coordinator.push("mnist", None).await.unwrap_err();
        assert!(matches!(err, MetadataError::StoreNotFound(_)));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn test_pull_into_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pulled");
        let coordinator = stub_coordinator(&destination, StubTransport::serving(&training_document()));

        let result = coordinator.pull("mnist", None, &destination).await.unwrap();

        let TransferResult::Pulled { summary, destination: written, .. } = result else {
            panic!("expected a pull result");
        };
        assert_eq!(written, destination);
        assert_eq!(summary.executions.created, 2);
        assert_eq!(pulled_counts(&destination).await, [1, 2, 2, 3, 4]);

        let fetched = coordinator.transport.fetched.lock().unwrap();
        assert_eq!(fetched[0], ("mnist".to_string(), None));
    }

    #[tokio::test]
    async fn test_pull_twice_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pulled");
        let coordinator = stub_coordinator(&destination, StubTransport::serving(&training_document()));

        coordinator.pull("mnist", None, &destination).await.unwrap();
        let result = coordinator.pull("mnist", None, &destination).await.unwrap();

        assert!(matches!(
            result,
            TransferResult::Pulled { summary, .. } if summary.total_created() == 0
        ));
        assert_eq!(pulled_counts(&destination).await, [1, 2, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_pull_merges_into_existing_store() {
        let (_dir, store) = local_store().await;
        let other = document(
            "mnist",
            vec![("evaluate", vec![execution("u-eval", vec![input(artifact("model.pkl", "/models/model.pkl", None))])])],
        );
        let coordinator = stub_coordinator(&store, StubTransport::serving(&other));

        coordinator.pull("mnist", None, &store).await.unwrap();

        // One new stage, execution and event; model.pkl is reused
        assert_eq!(pulled_counts(&store).await, [1, 3, 3, 3, 5]);
    }

    #[tokio::test]
    async fn test_scoped_pull_keeps_only_that_execution() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pulled");

        let data = artifact("data", "/d", None);
        let served = document(
            "p",
            vec![
                ("a", vec![execution("u1", vec![output(data.clone())])]),
                ("b", vec![execution("u2", vec![input(data), output(artifact("m", "/m", None))])]),
                ("c", vec![execution("u3", vec![output(artifact("r", "/r", None))])]),
            ],
        );
        let coordinator = stub_coordinator(&destination, StubTransport::serving(&served));

        coordinator.pull("p", Some("u2"), &destination).await.unwrap();

        assert_eq!(pulled_counts(&destination).await, [1, 1, 1, 2, 2]);
        let fetched = coordinator.transport.fetched.lock().unwrap();
        assert_eq!(fetched[0].1.as_deref(), Some("u2"));
    }

    #[tokio::test]
    async fn test_pull_sentinel_means_missing_execution() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pulled");
        let coordinator = stub_coordinator(&destination, StubTransport::new(200, NO_EXECUTION_SENTINEL));

        let err = coordinator.pull("p", Some("uX"), &destination).await.unwrap_err();

        assert!(matches!(err, MetadataError::ExecutionUuidNotFound(uuid) if uuid == "uX"));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_pull_execution_absent_from_received_document() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pulled");
        let coordinator = stub_coordinator(&destination, StubTransport::serving(&training_document()));

        let err = coordinator.pull("mnist", Some("uX"), &destination).await.unwrap_err();

        assert!(matches!(err, MetadataError::ExecutionUuidNotFound(_)));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_pull_error_statuses_leave_no_store() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pulled");

        let cases: [(u16, fn(&MetadataError) -> bool); 6] = [
            (413, |e| matches!(e, MetadataError::NoMetadataOnServer)),
            (406, |e| matches!(e, MetadataError::PipelineNotFound(_))),
            (404, |e| matches!(e, MetadataError::ServerUnavailable)),
            (422, |e| matches!(e, MetadataError::ProtocolVersionMismatch)),
            (500, |e| matches!(e, MetadataError::InternalServerError)),
            (418, |e| matches!(e, MetadataError::UnexpectedStatus { status: 418, .. })),
        ];

        for (status, expected) in cases {
            let coordinator = stub_coordinator(&destination, StubTransport::new(status, "nope"));
            let err = coordinator.pull("mnist", None, &destination).await.unwrap_err();
            assert!(expected(&err), "status {} gave {:?}", status, err);
            assert!(!destination.exists());
        }
    }

    #[tokio::test]
    async fn test_pull_rejects_bad_documents() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pulled");

        let coordinator = stub_coordinator(&destination, StubTransport::new(200, "{not json"));
        let err = coordinator.pull("mnist", None, &destination).await.unwrap_err();
        assert!(matches!(err, MetadataError::MalformedDocument(_)));

        let coordinator = stub_coordinator(&destination, StubTransport::serving(&training_document()));
        let err = coordinator.pull("other", None, &destination).await.unwrap_err();
        assert!(matches!(err, MetadataError::MalformedDocument(_)));

        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_pull_validates_destination_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = stub_coordinator(dir.path(), StubTransport::serving(&training_document()));

        let err = coordinator.pull("mnist", None, dir.path()).await.unwrap_err();
        assert!(matches!(err, MetadataError::InvalidDestination(_)));

        let nested = dir.path().join("missing").join("mlmd");
        let err = coordinator.pull("mnist", None, &nested).await.unwrap_err();
        assert!(matches!(err, MetadataError::InvalidDestination(_)));

        assert_eq!(coordinator.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_pull_conflict_leaves_existing_store_untouched() {
        let (_dir, store) = local_store().await;
        let before = pulled_counts(&store).await;

        let conflicting = document(
            "mnist",
            vec![("train", vec![execution("u-new", vec![input(artifact("train.csv", "/data/train.csv", Some("zz")))])])],
        );
        let coordinator = stub_coordinator(&store, StubTransport::serving(&conflicting));

        let err = coordinator.pull("mnist", None, &store).await.unwrap_err();
        assert!(matches!(err, MetadataError::ArtifactIdentityConflict { .. }));
        assert_eq!(pulled_counts(&store).await, before);
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        // Connections queue in the backlog but are never answered
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pulled");
        let config = TransferConfig::new(format!("http://{}", addr))
            .with_request_timeout(std::time::Duration::from_millis(200));
        let coordinator = TransferCoordinator::from_config(config).unwrap();
        assert_eq!(coordinator.config().request_timeout.as_millis(), 200);

        let err = coordinator.pull("mnist", None, &destination).await.unwrap_err();

        assert!(matches!(err, MetadataError::TransientTransport(ref msg) if msg.starts_with("request timed out")));
        assert!(!destination.exists());
        drop(listener);
    }

    #[tokio::test]
    async fn test_connection_failure_is_transient() {
        // Reserve a port, then free it so nothing is listening there
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pulled");
        let config = TransferConfig::new(format!("http://{}", addr)).with_local_store(&destination);
        let coordinator = TransferCoordinator::from_config(config).unwrap();

        let err = coordinator.pull("mnist", None, &destination).await.unwrap_err();

        assert!(matches!(err, MetadataError::TransientTransport(_)));
        assert!(err.is_retryable());
        assert!(!destination.exists());
    }
}
