//! Sitemap loading module
//!
//! This module turns a remote sitemap into the ordered work queue of a run:
//! - Fetching the document with a single GET (no retries at this layer)
//! - Parsing `<urlset>` and `<sitemapindex>` documents
//! - Validating and normalizing every `<loc>`
//! - Preserving document order so the same offset always means the same URL

mod parser;

pub use parser::{parse_sitemap, DocumentKind, ParsedSitemap, RawEntry};

use crate::url::normalize_url;
use crate::SitemapError;
use reqwest::Client;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use url::Url;

/// Sitemap indexes nested deeper than this are rejected
const MAX_INDEX_DEPTH: usize = 3;

/// A URL taken from the sitemap, with its position in the run's work queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapUrl {
    /// The normalized absolute URL
    pub url: Url,
    /// Zero-based ordinal in document order (after index expansion)
    pub position: usize,
}

impl SitemapUrl {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for SitemapUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Fetches and parses sitemaps into ordered URL lists
#[derive(Debug, Clone)]
pub struct SitemapLoader {
    client: Client,
}

type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SitemapError>> + Send + 'a>>;

impl SitemapLoader {
    /// Creates a loader that issues requests through `client`
    ///
    /// Request timeouts are whatever the client was built with.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Loads a sitemap and returns its URLs in document order
    ///
    /// Entries without a valid absolute http(s) location are skipped with a
    /// warning. Sitemap indexes are expanded child by child, in order.
    /// Repeated locations keep only their first position.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SitemapUrl>)` - At least one valid URL
    /// * `Err(SitemapError::Fetch)` - Transport failure or non-2xx status
    /// * `Err(SitemapError::Parse)` - Malformed XML or zero valid entries
    pub async fn load(&self, sitemap_url: &str) -> Result<Vec<SitemapUrl>, SitemapError> {
        tracing::info!("Fetching sitemap: {}", sitemap_url);

        let mut locations = Vec::new();
        self.load_into(sitemap_url, 0, &mut locations).await?;

        let mut seen = HashSet::new();
        let mut urls = Vec::with_capacity(locations.len());
        for url in locations {
            if !seen.insert(url.as_str().to_string()) {
                tracing::debug!("Duplicate sitemap entry dropped: {}", url);
                continue;
            }
            urls.push(SitemapUrl {
                url,
                position: urls.len(),
            });
        }

        if urls.is_empty() {
            return Err(SitemapError::Parse {
                url: sitemap_url.to_string(),
                message: "sitemap contains no valid URL entries".to_string(),
            });
        }

        tracing::info!("Extracted {} URLs from sitemap", urls.len());
        Ok(urls)
    }

    fn load_into<'a>(
        &'a self,
        sitemap_url: &'a str,
        depth: usize,
        out: &'a mut Vec<Url>,
    ) -> LoadFuture<'a> {
        Box::pin(async move {
            let body = self.fetch_document(sitemap_url).await?;
            let parsed = parse_sitemap(&body).map_err(|message| SitemapError::Parse {
                url: sitemap_url.to_string(),
                message,
            })?;

            match parsed.kind {
                DocumentKind::UrlSet => {
                    out.extend(valid_locations(sitemap_url, &parsed.entries));
                }
                DocumentKind::Index => {
                    if depth >= MAX_INDEX_DEPTH {
                        return Err(SitemapError::Parse {
                            url: sitemap_url.to_string(),
                            message: format!(
                                "sitemap index nesting exceeds {} levels",
                                MAX_INDEX_DEPTH
                            ),
                        });
                    }
                    for child in valid_locations(sitemap_url, &parsed.entries) {
                        tracing::info!("Sub-sitemap found: {}", child);
                        self.load_into(child.as_str(), depth + 1, out).await?;
                    }
                }
            }

            Ok(())
        })
    }

    async fn fetch_document(&self, sitemap_url: &str) -> Result<String, SitemapError> {
        let fetch_error = |message: String| SitemapError::Fetch {
            url: sitemap_url.to_string(),
            message,
        };

        let response = self
            .client
            .get(sitemap_url)
            .send()
            .await
            .map_err(|e| fetch_error(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| fetch_error(format!("failed to read body: {}", e)))
    }
}

/// Normalizes the `<loc>` of every entry, logging and dropping invalid ones
fn valid_locations(sitemap_url: &str, entries: &[RawEntry]) -> Vec<Url> {
    entries
        .iter()
        .filter_map(|entry| match entry.loc.as_deref() {
            None => {
                tracing::warn!(
                    "Skipping entry #{} in {}: no <loc> element",
                    entry.position + 1,
                    sitemap_url
                );
                None
            }
            Some(loc) => match normalize_url(loc) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(
                        "Skipping entry #{} in {}: invalid location '{}': {}",
                        entry.position + 1,
                        sitemap_url,
                        loc.trim(),
                        e
                    );
                    None
                }
            },
        })
        .collect()
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}
