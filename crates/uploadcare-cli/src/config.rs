//! CLI configuration

use serde::Serialize;
use std::time::Duration;
use uploadcare_client::{Config, DEFAULT_API_BASE, DEFAULT_UPLOAD_BASE};

/// Settings gathered from flags and environment
#[derive(Clone, Serialize)]
pub struct CliConfig {
    /// Project public key
    pub public_key: String,
    /// Project secret key
    #[serde(skip_serializing)]
    pub secret_key: String,
    /// REST API base URL
    pub api_base: String,
    /// Upload API base URL
    pub upload_base: String,
    /// Request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Delay between URL import polls (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            secret_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            request_timeout_secs: 30,
            poll_interval_ms: 100,
        }
    }
}

impl CliConfig {
    /// Build the client configuration
    pub fn client_config(&self) -> anyhow::Result<Config> {
        if self.public_key.is_empty() || self.secret_key.is_empty() {
            anyhow::bail!("both a public key and a secret key are required");
        }

        Ok(Config::new(&self.public_key, &self.secret_key)
            .with_api_base(&self.api_base)
            .with_upload_base(&self.upload_base)
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms)))
    }
}
