//! Remote endpoint configuration

use std::time::Duration;

/// Default service origin
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Default path prefix of the snippet service
pub const DEFAULT_API_SHARE: &str = "/api/share";

/// Default path prefix of the build service
pub const DEFAULT_API_RUN: &str = "/api/run";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable the front-end reads `server_url` from
pub const ENV_SERVER_URL: &str = "PLAYGROUND_SERVER_URL";
/// Environment variable the front-end reads `api_share` from
pub const ENV_API_SHARE: &str = "PLAYGROUND_API_SHARE";
/// Environment variable the front-end reads `api_run` from
pub const ENV_API_RUN: &str = "PLAYGROUND_API_RUN";
/// Environment variable the front-end reads `api_key` from
pub const ENV_API_KEY: &str = "PLAYGROUND_API_KEY";

/// Endpoints and credentials, fixed at client construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    pub api_share: String,
    pub api_run: String,
    /// Sent as `x-api-key` on every request
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_share: DEFAULT_API_SHARE.to_string(),
            api_run: DEFAULT_API_RUN.to_string(),
            api_key: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create config with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With server origin
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// With API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// With request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
