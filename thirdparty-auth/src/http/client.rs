//! HTTP client builder for provider, discovery, JWKS and core calls.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::BackoffPolicy;
use crate::error::Error;

/// HTTP client configuration.
///
/// The engine makes single-attempt calls; timeouts and retries are the
/// embedding host's choice and both are off by default.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout, if any.
    pub timeout: Option<Duration>,
    /// Maximum number of retries for transient failures.
    pub max_retries: u32,
    /// User agent string. Some providers (GitHub) reject requests without one.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_retries: 0,
            user_agent: format!("thirdparty-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client shared by every upstream call the engine makes.
pub type HttpClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for creating HTTP clients with middleware.
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: HttpClientConfig) -> Self {
        Self { config }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the maximum number of retries. Zero disables the retry middleware.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// Build the configured HTTP client.
    pub fn build(self) -> Result<HttpClient, Error> {
        let mut builder = reqwest::Client::builder().user_agent(self.config.user_agent);
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let mut middleware = ClientBuilder::new(client);
        if self.config.max_retries > 0 {
            let policy = BackoffPolicy::new(self.config.max_retries);
            middleware = middleware.with(RetryTransientMiddleware::new_with_policy(policy));
        }

        Ok(middleware.build())
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
