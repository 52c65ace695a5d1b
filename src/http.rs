//! Shared HTTP client construction
//!
//! One client is built per run and shared by the sitemap loader, the
//! identity-provider calls and the indexing client.

use reqwest::Client;
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Builds an HTTP client whose every request is bounded by `timeout`
///
/// # Example
///
/// ```no_run
/// use sitemap_indexer::http::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}
