use crate::UrlError;
use url::Url;

/// Normalizes a sitemap location into the absolute URL that gets submitted
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace (sitemaps often pretty-print `<loc>`)
/// 2. Parse the URL; reject if malformed or relative
/// 3. Require an `http` or `https` scheme
/// 4. Require a host
/// 5. Remove the fragment (everything after #)
/// 6. Remove an empty query string (trailing ?)
///
/// Host lowercasing and dot-segment removal come from the URL parser itself.
/// Path, query order and `www.` are left untouched: the indexing service
/// keys notifications on the exact URL the site declares.
///
/// # Examples
///
/// ```
/// use sitemap_indexer::url::normalize_url;
///
/// let url = normalize_url("  https://EXAMPLE.com/a/../page#top ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost),
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}
