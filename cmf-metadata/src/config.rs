//! Transfer configuration
//!
//! Built explicitly by the caller and handed to the transfer coordinator.

use std::path::PathBuf;
use std::time::Duration;

use cmf_core::dto::transfer::PROTOCOL_VERSION;

/// Server used when none is configured
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:80";

/// Local metadata store used when none is configured
pub const DEFAULT_STORE_PATH: &str = "./mlmd";

#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Aggregation server base URL (e.g., "http://127.0.0.1:80")
    pub server_url: String,

    /// Local store read by push
    pub local_store_path: PathBuf,

    /// Upper bound on one network round trip
    pub request_timeout: Duration,

    /// Protocol version announced to the server
    pub protocol_version: u32,
}

impl TransferConfig {
    /// Creates a configuration with defaults for everything but the server
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            local_store_path: PathBuf::from(DEFAULT_STORE_PATH),
            request_timeout: Duration::from_secs(60),
            protocol_version: PROTOCOL_VERSION,
        }
    }

    pub fn with_local_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_store_path = path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}
