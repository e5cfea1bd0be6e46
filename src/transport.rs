//! HTTP transport abstraction for testability.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

use crate::error::Result;

/// Default timeout for a single API request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Abstraction over the HTTP GET requests issued by the API client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs a GET request and returns the raw response body.
    async fn get(&self, url: &Url) -> Result<Bytes>;
}

/// Default transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with pooling and the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<Bytes> {
        let response = self.client.get(url.clone()).send().await?;
        Ok(response.bytes().await?)
    }
}

/// Builds a configured HTTP client for Uptobox requests.
///
/// # Errors
///
/// Returns an error if the client cannot be built.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}
