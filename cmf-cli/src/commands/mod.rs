//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod metadata;

pub use metadata::MetadataCommands;

use anyhow::Result;
use clap::Subcommand;
use cmf_metadata::MetadataError;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Metadata transfer and local store management
    Metadata {
        #[command(subcommand)]
        command: MetadataCommands,
    },
}

/// Handle a CLI command
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Metadata { command } => metadata::handle_metadata_command(command, config).await,
    }
}

/// One message per failure kind
pub fn describe_error(err: &anyhow::Error) -> String {
    let Some(err) = err.downcast_ref::<MetadataError>() else {
        return format!("{:#}", err);
    };

    match err {
        MetadataError::PipelineNotFound(name) => format!("Pipeline '{}' not found.", name),
        MetadataError::ExecutionUuidNotFound(uuid) => {
            format!("Execution UUID '{}' is not part of the pipeline.", uuid)
        }
        MetadataError::ArtifactIdentityConflict { name, uri, existing_hash, incoming_hash } => format!(
            "Artifact '{}' at {} conflicts: stored hash {}, incoming hash {}. Nothing was merged.",
            name, uri, existing_hash, incoming_hash
        ),
        MetadataError::MalformedDocument(msg) => format!("Metadata document is malformed: {}", msg),
        MetadataError::TransientTransport(msg) => {
            format!("Could not reach the CMF server ({}). Retry later.", msg)
        }
        MetadataError::ProtocolVersionMismatch => {
            "CMF server speaks a different protocol version. Update cmf.".to_string()
        }
        MetadataError::ServerUnavailable => "CMF server is not available. Retry later.".to_string(),
        MetadataError::InternalServerError => {
            "CMF server hit an internal error. Retry later.".to_string()
        }
        MetadataError::NoMetadataOnServer => "No metadata available on the CMF server.".to_string(),
        MetadataError::UnexpectedStatus { status, body } => {
            format!("CMF server answered with status {}: {}", status, body)
        }
        MetadataError::StoreUnavailable(msg) => {
            format!("Metadata store is busy or unreachable: {}", msg)
        }
        MetadataError::StoreNotFound(path) => {
            format!("No metadata store at {}. Run a pipeline or pull first.", path.display())
        }
        MetadataError::IncompatibleStore { path, missing } => format!(
            "{} is not a metadata store (missing tables: {}).",
            path.display(),
            missing
        ),
        MetadataError::InvalidDestination(msg) => format!("Cannot pull there: {}", msg),
        MetadataError::InvalidArgument(msg) => format!("Invalid argument: {}", msg),
        MetadataError::Database(err) => format!("Metadata store error: {}", err),
    }
}
