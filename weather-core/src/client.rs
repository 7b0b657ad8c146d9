use std::sync::Arc;

use reqwest::{Client, Method, Response};
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::{
    config::ClientSettings,
    error::{FetchError, UNDECODABLE_ERROR_MESSAGE},
};

/// Error body returned by upstreams on failure.
#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    #[serde(default)]
    message: String,
}

/// Outbound HTTP client for a single upstream host.
///
/// reqwest pools connections but never caps them, so concurrent calls are gated by a
/// semaphore sized to `max_connections_per_host`. Excess calls wait for a permit.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: Client,
    permits: Arc<Semaphore>,
}

impl ResourceClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(settings.timeout())
            .pool_max_idle_per_host(settings.max_connections_per_host)
            .build()?;

        Ok(Self::with_client(http, settings.max_connections_per_host))
    }

    pub fn with_client(http: Client, max_connections_per_host: usize) -> Self {
        let permits = max_connections_per_host.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            http,
            permits: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Perform one request and return the full body of a successful response.
    ///
    /// The body is always read to the end, so the connection goes back to the pool on
    /// every path.
    pub async fn fetch(&self, method: Method, url: &str) -> Result<Vec<u8>, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::internal(e.to_string()))?;

        let response = self
            .http
            .request(method, url)
            .send()
            .await
            .map_err(|e| FetchError::internal(e.to_string()))?;

        let response = check_status(response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::internal(e.to_string()))?;

        Ok(body.to_vec())
    }
}

async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }

    let message = match response.bytes().await {
        Ok(body) => serde_json::from_slice::<UpstreamErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| UNDECODABLE_ERROR_MESSAGE.to_string()),
        Err(_) => UNDECODABLE_ERROR_MESSAGE.to_string(),
    };

    Err(FetchError::from_status(status, message))
}
