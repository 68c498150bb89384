//! Public configuration for the HTTP adapters.

use std::time::Duration;

use crate::error::{HttpAdapterError, HttpResult};

/// Configuration shared by the fetcher, resolver and destination client.
///
/// # Example
///
/// ```
/// use mediarelay_http::HttpClientConfig;
/// use std::time::Duration;
///
/// let config = HttpClientConfig::new()
///     .with_timeout(Duration::from_secs(120))
///     .with_user_agent("my-relay/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Whole-request timeout for metadata and upload calls
    pub(crate) timeout: Duration,
    /// TCP connect timeout
    pub(crate) connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("mediarelay/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout.
    ///
    /// Defaults to 300 seconds. Streamed downloads are not bound by it.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build a reqwest client for non-streaming calls.
    pub(crate) fn build_client(&self) -> HttpResult<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(HttpAdapterError::from)
    }

    /// Build a reqwest client for streamed downloads (no total timeout).
    pub(crate) fn build_streaming_client(&self) -> HttpResult<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(HttpAdapterError::from)
    }
}
