//! HTTP transport module.
//!
//! The validation engine only sees the [`Transport`] contract: fetch a set
//! of URLs concurrently and return the bodies that arrived.

mod http;

use std::time::Duration;

use async_trait::async_trait;

pub use http::HttpTransport;

/// A body fetched successfully from one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub url: String,
    pub body: String,
    /// Time from the start of the batch until this body was read.
    pub elapsed: Duration,
}

/// Concurrent GET of a batch of URLs.
///
/// Implementations must issue the requests concurrently, wait for every one
/// to finish or time out, and return only the successful ones. Failed or
/// timed out URLs are left out, not reported as errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_all(&self, urls: &[String]) -> Vec<FetchedBody>;
}
