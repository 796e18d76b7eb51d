//! Multi-host request dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::protocol::{ValidationRequest, ValidationResponse};
use crate::transport::Transport;

/// Sends a request set to its hosts and collects the responses.
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Issue every request concurrently and wait for all of them.
    ///
    /// Only requests that completed at the transport level produce a
    /// response. Unreachable or timed out hosts are absent from the result.
    pub async fn dispatch(&self, requests: &[ValidationRequest]) -> Vec<ValidationResponse> {
        if requests.is_empty() {
            return Vec::new();
        }

        let hosts: HashMap<&str, &str> = requests.iter().map(|r| (r.url(), r.host())).collect();
        let urls: Vec<String> = requests.iter().map(|r| r.url().to_string()).collect();

        let bodies = self.transport.fetch_all(&urls).await;

        let mut responses = Vec::with_capacity(bodies.len());
        for fetched in bodies {
            let Some(host) = hosts.get(fetched.url.as_str()) else {
                warn!(url = %fetched.url, "Transport returned a URL that was not requested");
                continue;
            };

            let response = ValidationResponse::parse(&fetched.body, *host, fetched.elapsed);
            debug!(
                host = %response.host,
                status = response.status.as_ref().map(|s| s.as_str()).unwrap_or("-"),
                elapsed_ms = response.elapsed.as_millis() as u64,
                "Parsed response"
            );
            responses.push(response);
        }

        if responses.len() < requests.len() {
            warn!(
                requested = requests.len(),
                received = responses.len(),
                "Some hosts did not answer"
            );
        }

        responses
    }
}
