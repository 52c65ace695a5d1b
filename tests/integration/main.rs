//! Integration tests for Sitemap-Indexer
//!
//! These tests use wiremock to stand in for the sitemap host, the indexing
//! endpoint and the identity provider's token endpoint, and drive the consent
//! callback with a real HTTP client.

mod common;
mod engine_tests;
mod sitemap_tests;
