//! CMF CLI
//!
//! Command-line interface for syncing pipeline metadata with a CMF server.

mod commands;
mod config;

use clap::Parser;
use colored::*;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cmf")]
#[command(about = "Common Metadata Framework CLI", long_about = None)]
struct Cli {
    /// CMF server URL
    #[arg(long, env = "CMF_SERVER_URL", default_value = cmf_metadata::config::DEFAULT_SERVER_URL)]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr; results are printed to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
    };

    if let Err(err) = handle_command(cli.command, &config).await {
        eprintln!("{} {}", "✗".red().bold(), commands::describe_error(&err));
        std::process::exit(1);
    }
}
