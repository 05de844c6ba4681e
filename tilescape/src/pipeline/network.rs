//! Network port used by the remote providers.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::error::PipelineError;

/// Default User-Agent string for HTTP requests.
///
/// The public OpenStreetMap endpoints reject anonymous clients.
const DEFAULT_USER_AGENT: &str = concat!("tilescape/", env!("CARGO_PKG_VERSION"));

/// Asynchronous HTTP GET.
pub trait NetworkService: Send + Sync {
    /// Fetches `url` and returns the body as text.
    fn get(&self, url: &str) -> impl Future<Output = Result<String, PipelineError>> + Send;

    /// Fetches `url` and returns the raw body.
    fn get_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, PipelineError>> + Send;
}

/// [`NetworkService`] backed by an async reqwest client.
#[derive(Clone)]
pub struct ReqwestNetworkService {
    client: reqwest::Client,
}

impl ReqwestNetworkService {
    /// Creates a client with the given request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| PipelineError::Network {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response, PipelineError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(network_error(url, format!("Request failed: {}", e)));
            }
        };

        if !response.status().is_success() {
            warn!(
                url = url,
                status = response.status().as_u16(),
                "HTTP error status"
            );
            return Err(network_error(url, format!("HTTP {}", response.status())));
        }

        Ok(response)
    }
}

impl NetworkService for ReqwestNetworkService {
    async fn get(&self, url: &str) -> Result<String, PipelineError> {
        self.fetch(url)
            .await?
            .text()
            .await
            .map_err(|e| network_error(url, format!("Failed to read response: {}", e)))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        match self.fetch(url).await?.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(network_error(url, format!("Failed to read response: {}", e)))
            }
        }
    }
}

fn network_error(url: &str, message: String) -> PipelineError {
    PipelineError::Network {
        url: url.to_string(),
        message,
    }
}
