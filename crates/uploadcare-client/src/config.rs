//! Client configuration

use std::fmt;
use std::time::Duration;

/// Default REST API base URL
pub const DEFAULT_API_BASE: &str = "https://api.uploadcare.com";
/// Default upload API base URL
pub const DEFAULT_UPLOAD_BASE: &str = "https://upload.uploadcare.com";
/// Delay between two URL import status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Project key pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Public key, sent in clear
    pub public_key: String,
    /// Secret key, only ever used as the HMAC key
    pub private_key: String,
}

impl Credentials {
    /// Create a key pair
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Project keys
    pub credentials: Credentials,
    /// REST API base URL
    pub api_base: String,
    /// Upload API base URL
    pub upload_base: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Delay between URL import status polls
    pub poll_interval: Duration,
}

impl Config {
    /// Create a new config with the given keys
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(public_key, private_key),
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("uploadcare-client/{}", env!("CARGO_PKG_VERSION")),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Point both APIs at a different host (mock servers, proxies)
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.api_base = base.clone();
        self.upload_base = base;
        self
    }

    /// Set the REST API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Set the upload API base URL
    pub fn with_upload_base(mut self, base: impl Into<String>) -> Self {
        self.upload_base = base.into();
        self
    }

    /// Toggle TLS on the default hosts.
    ///
    /// Plain HTTP is deprecated by the service and logs a warning.
    pub fn with_ssl(mut self, ssl: bool) -> Self {
        let (from, to) = if ssl { ("http://", "https://") } else { ("https://", "http://") };
        if !ssl {
            tracing::warn!("HTTP requests won't be supported soon. Please keep TLS enabled.");
        }
        self.api_base = self.api_base.replacen(from, to, 1);
        self.upload_base = self.upload_base.replacen(from, to, 1);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the URL import poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// REST API URL for a signed path
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    /// Upload API URL for a path
    pub fn upload_url(&self, path: &str) -> String {
        format!("{}{}", self.upload_base.trim_end_matches('/'), path)
    }
}
