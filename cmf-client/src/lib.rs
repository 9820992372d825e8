//! CMF HTTP Client
//!
//! Transport between a local metadata store and the CMF aggregation server.
//!
//! The client never interprets metadata: it ships serialized subgraphs and
//! hands back the raw status and body, which callers classify with
//! [`TransferStatus`].
//!
//! # Example
//!
//! ```no_run
//! use cmf_client::{MetadataTransport, ServerClient};
//!
//! # async fn example() -> cmf_client::Result<()> {
//! let client = ServerClient::new("http://127.0.0.1:80");
//! let response = client.fetch_subgraph("mnist", None).await?;
//! println!("server answered: {}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod error;
mod metadata;
pub mod status;

pub use error::{ClientError, Result};
pub use status::TransferStatus;

use async_trait::async_trait;
use cmf_core::dto::transfer::PushRequest;
use reqwest::Client;

/// Status and body of a server response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status_code: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    /// Typed meaning of the status code
    pub fn status(&self) -> TransferStatus {
        TransferStatus::from_status(self.status_code)
    }
}

/// Boundary calls to the aggregation server
///
/// Trait-based so the transfer coordinator can be exercised without a
/// network.
#[async_trait]
pub trait MetadataTransport: Send + Sync {
    /// Send a serialized subgraph to the server
    async fn send_subgraph(&self, request: &PushRequest) -> Result<TransportResponse>;

    /// Request the subgraph of `pipeline_name`, optionally scoped to one execution
    async fn fetch_subgraph(
        &self,
        pipeline_name: &str,
        execution_uuid: Option<&str>,
    ) -> Result<TransportResponse>;
}

/// HTTP client for the CMF aggregation server
#[derive(Debug, Clone)]
pub struct ServerClient {
    /// Base URL of the server (e.g., "http://127.0.0.1:80")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ServerClient {
    /// Create a new server client
    ///
    /// # Example
    /// ```
    /// use cmf_client::ServerClient;
    ///
    /// let client = ServerClient::new("http://127.0.0.1:80");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new server client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read status and body without judging the status
    async fn into_transport_response(response: reqwest::Response) -> Result<TransportResponse> {
        let status_code = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status = status_code, bytes = body.len(), "Server responded");

        Ok(TransportResponse { status_code, body })
    }
}
