//! URL handling module for Sitemap-Indexer
//!
//! Sitemap locations are validated and normalized here before they enter the
//! work queue or the ledger, so both always compare the same string form.

mod normalize;

pub use normalize::normalize_url;
