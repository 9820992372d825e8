//! Metadata command handlers
//!
//! Push and pull talk to the CMF server; export and import move a pipeline
//! between a local store and a JSON file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use cmf_core::dto::document::{MergeScope, MetadataDocument};
use cmf_core::dto::summary::MergeSummary;
use cmf_metadata::config::DEFAULT_STORE_PATH;
use cmf_metadata::service::{export_service, merge_service};
use cmf_metadata::{MetadataError, TransferConfig, TransferCoordinator, TransferResult, db};
use colored::*;

use crate::config::Config;

/// Metadata subcommands
#[derive(Subcommand)]
pub enum MetadataCommands {
    /// Push a pipeline from the local store to the CMF server
    Push {
        /// Pipeline name
        #[arg(short, long)]
        pipeline: String,

        /// Local metadata store
        #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
        file: String,

        /// Push only the execution with this UUID
        #[arg(short, long)]
        execution: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Pull a pipeline from the CMF server into a local store
    Pull {
        /// Pipeline name
        #[arg(short, long)]
        pipeline: String,

        /// Local metadata store, created if missing
        #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
        file: String,

        /// Pull only the execution with this UUID
        #[arg(short, long)]
        execution: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Write a pipeline from the local store as JSON
    Export {
        /// Pipeline name
        #[arg(short, long)]
        pipeline: String,

        /// Local metadata store
        #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
        file: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        json: Option<String>,

        /// Export only the execution with this UUID
        #[arg(short, long)]
        execution: Option<String>,
    },
    /// Merge a JSON metadata document into a local store
    Import {
        /// JSON document to merge
        #[arg(short, long)]
        json: String,

        /// Local metadata store, created if missing
        #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
        file: String,

        /// Import only the execution with this UUID
        #[arg(short, long)]
        execution: Option<String>,
    },
}

/// Handle metadata commands
pub async fn handle_metadata_command(command: MetadataCommands, config: &Config) -> Result<()> {
    match command {
        MetadataCommands::Push {
            pipeline,
            file,
            execution,
            timeout,
        } => {
            let coordinator = coordinator(config, &file, timeout)?;
            let result = coordinator.push(&pipeline, execution.as_deref()).await?;
            print_result(&result, &coordinator.config().server_url);
            Ok(())
        }
        MetadataCommands::Pull {
            pipeline,
            file,
            execution,
            timeout,
        } => {
            let coordinator = coordinator(config, &file, timeout)?;
            let result = coordinator
                .pull(&pipeline, execution.as_deref(), Path::new(&file))
                .await?;
            print_result(&result, &coordinator.config().server_url);
            Ok(())
        }
        MetadataCommands::Export {
            pipeline,
            file,
            json,
            execution,
        } => export_pipeline(&pipeline, Path::new(&file), json.as_deref(), execution.as_deref()).await,
        MetadataCommands::Import {
            json,
            file,
            execution,
        } => {
            let summary = import_document(Path::new(&json), Path::new(&file), execution.as_deref()).await?;
            println!("{}", "✓ Metadata imported successfully!".green().bold());
            println!("  Store:  {}", file.cyan());
            print_summary(&summary);
            Ok(())
        }
    }
}

fn coordinator(config: &Config, store: &str, timeout: Option<u64>) -> Result<TransferCoordinator> {
    let mut transfer = TransferConfig::new(&config.server_url).with_local_store(store);
    if let Some(secs) = timeout {
        transfer = transfer.with_request_timeout(Duration::from_secs(secs));
    }

    Ok(TransferCoordinator::from_config(transfer)?)
}

/// Export a pipeline to `json`, or to stdout
async fn export_pipeline(
    pipeline: &str,
    store: &Path,
    json: Option<&str>,
    execution: Option<&str>,
) -> Result<()> {
    let pool = db::open_existing_store(store).await?;
    let exported = export_service::export_pipeline(&pool, pipeline, &MergeScope::from_execution_uuid(execution)).await;
    pool.close().await;

    let content = exported?.to_json_pretty().map_err(MetadataError::from)?;

    match json {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {}", path))?;
            println!(
                "{}",
                format!("✓ Pipeline {} exported to {}", pipeline, path).green().bold()
            );
        }
        None => println!("{}", content),
    }

    Ok(())
}

/// Merge the document in `json` into the store at `store`
async fn import_document(json: &Path, store: &Path, execution: Option<&str>) -> Result<MergeSummary> {
    let content = std::fs::read_to_string(json)
        .with_context(|| format!("Failed to read {}", json.display()))?;

    // Validate before the store is created
    let scope = MergeScope::from_execution_uuid(execution);
    let document = MetadataDocument::from_json(&content).map_err(MetadataError::from)?;
    document.scoped(&scope).map_err(MetadataError::from)?;

    let pool = db::open_store(store).await?;
    let merged = merge_service::merge_document(&pool, &document, &scope).await;
    pool.close().await;

    Ok(merged?)
}

fn print_result(result: &TransferResult, server_url: &str) {
    match result {
        TransferResult::Pushed {
            pipeline,
            execution_uuid,
            summary,
        } => {
            println!("{}", "✓ Metadata pushed successfully!".green().bold());
            println!("  Pipeline:  {}", pipeline.cyan());
            if let Some(uuid) = execution_uuid {
                println!("  Execution: {}", uuid.cyan());
            }
            println!("  Server:    {}", server_url.cyan());
            if let Some(summary) = summary {
                print_summary(summary);
            }
        }
        TransferResult::Pulled {
            pipeline,
            execution_uuid,
            destination,
            summary,
        } => {
            println!("{}", "✓ Metadata pulled successfully!".green().bold());
            println!("  Pipeline:  {}", pipeline.cyan());
            if let Some(uuid) = execution_uuid {
                println!("  Execution: {}", uuid.cyan());
            }
            println!("  Server:    {}", server_url.cyan());
            println!("  Store:     {}", destination.display().to_string().cyan());
            print_summary(summary);
        }
    }
}

fn print_summary(summary: &MergeSummary) {
    let rows = [
        ("Pipelines", summary.pipelines),
        ("Stages", summary.stages),
        ("Executions", summary.executions),
        ("Artifacts", summary.artifacts),
        ("Events", summary.events),
    ];

    for (kind, counts) in rows {
        println!(
            "  {:<11}{} new, {} existing",
            format!("{}:", kind),
            counts.created.to_string().bold(),
            counts.matched.to_string().dimmed()
        );
    }
}
