//! Shared HTTP plumbing: client construction, JSON POST, retry loop.

use std::future::Future;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::error::ProviderError;

/// Timeout and retry policy for provider requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Attempts per call, the first one included
    pub max_attempts: u32,
    /// First backoff delay
    pub initial_backoff: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl HttpConfig {
    pub fn build_client(&self) -> Result<Client, ProviderError> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut backoff = self.backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, what, "Calling provider API");

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempts >= self.max_attempts {
                        error!(error = %e, what, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "API call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}

/// Send a prepared request and decode a JSON body.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
    let response = request
        .header("Content-Type", "application/json")
        .send()
        .await
        .map_err(|e| ProviderError::Api(e.to_string()))?;

    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited);
    }

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status { status, body });
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::Parse(e.to_string()))
}
