//! Sitemap loading over HTTP

use crate::common::urlset;
use sitemap_indexer::sitemap::SitemapLoader;
use sitemap_indexer::SitemapError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn loader() -> SitemapLoader {
    SitemapLoader::new(reqwest::Client::new())
}

#[tokio::test]
async fn test_urlset_in_document_order() {
    let server = MockServer::start().await;
    let urls: Vec<String> = (1..=5)
        .map(|i| format!("https://example.com/page-{}", i))
        .collect();
    serve(&server, "/sitemap.xml", urlset(&urls)).await;

    let loaded = loader()
        .load(&format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap();

    let got: Vec<&str> = loaded.iter().map(|u| u.as_str()).collect();
    assert_eq!(got, urls.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(loaded.iter().enumerate().all(|(i, u)| u.position == i));
}

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let server = MockServer::start().await;
    let body = r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/a</loc><lastmod>2024-01-01</lastmod></url>
  <url><loc>not a url</loc></url>
  <url><loc>ftp://example.com/file</loc></url>
  <url><priority>0.5</priority></url>
  <url><loc> https://example.com/b#section </loc></url>
</urlset>"#;
    serve(&server, "/sitemap.xml", body.to_string()).await;

    let loaded = loader()
        .load(&format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap();

    let got: Vec<&str> = loaded.iter().map(|u| u.as_str()).collect();
    assert_eq!(got, vec!["https://example.com/a", "https://example.com/b"]);
    assert_eq!(loaded[1].position, 1);
}

#[tokio::test]
async fn test_sitemap_index_is_expanded_in_order() {
    let server = MockServer::start().await;
    let index = format!(
        r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{0}/posts.xml</loc></sitemap>
  <sitemap><loc>{0}/pages.xml</loc></sitemap>
</sitemapindex>"#,
        server.uri()
    );
    serve(&server, "/sitemap.xml", index).await;
    serve(
        &server,
        "/posts.xml",
        urlset(&[
            "https://example.com/post-1".to_string(),
            "https://example.com/post-2".to_string(),
        ]),
    )
    .await;
    serve(
        &server,
        "/pages.xml",
        urlset(&[
            "https://example.com/about".to_string(),
            "https://example.com/post-1".to_string(),
        ]),
    )
    .await;

    let loaded = loader()
        .load(&format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap();

    let got: Vec<&str> = loaded.iter().map(|u| u.as_str()).collect();
    assert_eq!(
        got,
        vec![
            "https://example.com/post-1",
            "https://example.com/post-2",
            "https://example.com/about",
        ]
    );
    assert_eq!(loaded[2].position, 2);
}

#[tokio::test]
async fn test_failing_child_sitemap_fails_load() {
    let server = MockServer::start().await;
    let index = format!(
        "<sitemapindex><sitemap><loc>{}/missing.xml</loc></sitemap></sitemapindex>",
        server.uri()
    );
    serve(&server, "/sitemap.xml", index).await;

    let result = loader()
        .load(&format!("{}/sitemap.xml", server.uri()))
        .await;

    assert!(matches!(result, Err(SitemapError::Fetch { .. })));
}

#[tokio::test]
async fn test_http_error_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = loader()
        .load(&format!("{}/sitemap.xml", server.uri()))
        .await;

    assert!(matches!(result, Err(SitemapError::Fetch { .. })));
}

#[tokio::test]
async fn test_no_valid_entries_is_parse_error() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/sitemap.xml",
        "<urlset><url><loc>nope</loc></url></urlset>".to_string(),
    )
    .await;

    let result = loader()
        .load(&format!("{}/sitemap.xml", server.uri()))
        .await;

    assert!(matches!(result, Err(SitemapError::Parse { .. })));
}

#[tokio::test]
async fn test_malformed_xml_is_parse_error() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/sitemap.xml",
        "<urlset><url><loc>https://example.com/a</url></urlset>".to_string(),
    )
    .await;

    let result = loader()
        .load(&format!("{}/sitemap.xml", server.uri()))
        .await;

    assert!(matches!(result, Err(SitemapError::Parse { .. })));
}
