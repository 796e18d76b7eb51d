//! reqwest-backed transport.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::error::{ValidateError, ValidateResult};

use super::{FetchedBody, Transport};

/// Transport that issues real HTTP GETs.
///
/// One client is built per transport and reused across checks.
pub struct HttpTransport {
    client: Client,
    request_timeout: Duration,
    max_body_size: usize,
}

impl HttpTransport {
    /// Create a transport from the transport settings.
    pub fn new(config: &TransportConfig) -> ValidateResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ValidateError::Transport {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            max_body_size: config.max_body_size,
        })
    }

    /// GET one URL and read its body, aborting once it passes `max_body_size`.
    async fn fetch_one(&self, url: &str, started: Instant) -> Result<FetchedBody, String> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP status {}", status));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_body_size as u64 {
                return Err(format!(
                    "Body too large: declared {} bytes exceeds maximum of {} bytes",
                    declared, self.max_body_size
                ));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
            if bytes.len() + chunk.len() > self.max_body_size {
                return Err(format!(
                    "Body too large: exceeds maximum of {} bytes",
                    self.max_body_size
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedBody {
            url: url.to_string(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
            elapsed: started.elapsed(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_all(&self, urls: &[String]) -> Vec<FetchedBody> {
        let started = Instant::now();

        let fetches = urls.iter().map(|url| async move {
            match timeout(self.request_timeout, self.fetch_one(url, started)).await {
                Ok(Ok(body)) => {
                    debug!(
                        url = %url,
                        elapsed_ms = body.elapsed.as_millis() as u64,
                        "Response received"
                    );
                    Some(body)
                }
                Ok(Err(e)) => {
                    warn!(url = %url, error = %e, "Request failed, dropping response");
                    None
                }
                Err(_) => {
                    warn!(
                        url = %url,
                        timeout_ms = self.request_timeout.as_millis() as u64,
                        "Request timed out, dropping response"
                    );
                    None
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }
}
