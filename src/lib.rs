//! Sitemap-Indexer: resumable sitemap submission to a remote indexing API
//!
//! This crate walks a site's sitemap and notifies a remote indexing service of
//! every URL, one at a time, under a daily quota and a per-request pacing
//! interval. Progress is recorded in a durable ledger so interrupted or
//! quota-limited runs resume without re-submitting anything.

pub mod auth;
pub mod config;
pub mod engine;
pub mod http;
pub mod output;
pub mod sitemap;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sitemap-Indexer operations
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sitemap error: {0}")]
    Sitemap(#[from] SitemapError),

    #[error("Authentication error: {0}")]
    Auth(#[from] auth::AuthError),

    #[error("Persist error: {0}")]
    Persist(#[from] storage::StorageError),

    #[error("Daily indexing quota exhausted while submitting {url}: {message}")]
    QuotaExceeded { url: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Sitemap loading errors
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Failed to fetch sitemap {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to parse sitemap {url}: {message}")]
    Parse { url: String, message: String },
}

/// Result type alias for Sitemap-Indexer operations
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, Operation, RunConfig};
pub use engine::{RunSummary, StopReason, SubmissionEngine};
pub use state::{ResumeLedger, SubmissionOutcome};
pub use url::normalize_url;
