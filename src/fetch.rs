//! Log retrieval over HTTP
//!
//! One bounded-timeout GET per call, no retries. The whole body is buffered
//! before returning; there is no partial-read mode.

use async_trait::async_trait;
use std::time::Duration;

/// Errors from fetching the solver log
///
/// Every variant is fatal to the collection batch: all metrics in a batch
/// share one fetched document.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// No complete response within the configured bound
    #[error("Request to {url} timed out after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    /// Connection refused, DNS failure, or the body could not be read
    #[error("Failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Short label for metrics and logs
    pub fn outcome(&self) -> &'static str {
        match self {
            FetchError::ClientBuild(_) => "client_build",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Transport { .. } => "transport",
            FetchError::Status { .. } => "status",
        }
    }
}

/// Source of raw log bytes
///
/// Implemented by [`HttpFetcher`] in production. The collector only sees
/// this trait, so tests can serve a log from memory.
#[async_trait]
pub trait LogFetcher: Send + Sync {
    /// Fetch the resource at `resource_path` relative to the fetcher's base
    async fn fetch(&self, resource_path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Base address of the log server
///
/// `build_url("10.1.0.1", 8000)` is `"http://10.1.0.1:8000"`.
pub fn build_url(host: &str, port: u16) -> String {
    format!("http://{}:{}", host, port)
}

/// Join a base URL and a resource path with exactly one `/`
pub fn join_url(base_url: &str, resource_path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        resource_path.trim_start_matches('/')
    )
}

/// Fetches logs with a plain HTTP GET
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl HttpFetcher {
    /// Create a fetcher for `base_url` with a hard total timeout
    ///
    /// # Errors
    ///
    /// Returns `FetchError::ClientBuild` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(FetchError::ClientBuild)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout_seconds,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    fn classify(&self, url: &str, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_seconds: self.timeout_seconds,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl LogFetcher for HttpFetcher {
    async fn fetch(&self, resource_path: &str) -> Result<Vec<u8>, FetchError> {
        let url = join_url(&self.base_url, resource_path);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Log fetch failed");
                return Err(self.classify(&url, e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = %status, "Log server returned error status");
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        // The client timeout also bounds the body read
        let body = response.bytes().await.map_err(|e| self.classify(&url, e))?;

        tracing::debug!(url = %url, bytes = body.len(), "Fetched solver log");
        Ok(body.to_vec())
    }
}
