use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cmf_server=debug,cmf_metadata=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("CMF server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting CMF server...");

    // Aggregated store every push merges into
    let store_path =
        PathBuf::from(std::env::var("CMF_SERVER_STORE").unwrap_or_else(|_| "./cmf-server.mlmd".to_string()));

    tracing::info!("Opening metadata store at {}", store_path.display());

    let pool = cmf_metadata::db::open_store(&store_path).await?;

    // Build router with all API endpoints
    let app = api::create_router(pool);

    // Get bind address
    let addr = std::env::var("CMF_SERVER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
