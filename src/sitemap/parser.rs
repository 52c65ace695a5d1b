//! Sitemap XML parsing
//!
//! Handles the two document shapes of the sitemap protocol:
//! - `<urlset>` with `<url><loc>...</loc></url>` entries
//! - `<sitemapindex>` with `<sitemap><loc>...</loc></sitemap>` entries
//!
//! Namespace prefixes are ignored and unknown elements are skipped.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Kind of sitemap document, decided by the root element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `<urlset>`: entries are pages to submit
    UrlSet,
    /// `<sitemapindex>`: entries are child sitemaps
    Index,
}

/// One entry element of a sitemap document, before URL validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Zero-based position of the entry element in the document
    pub position: usize,
    /// Text of the first `<loc>` child, if the entry had one
    pub loc: Option<String>,
}

/// A parsed sitemap document
#[derive(Debug, Clone)]
pub struct ParsedSitemap {
    pub kind: DocumentKind,
    pub entries: Vec<RawEntry>,
}

/// Parses a sitemap document into its entries, in document order
///
/// # Returns
///
/// * `Ok(ParsedSitemap)` - Root element recognised and the XML was well formed
/// * `Err(String)` - Malformed XML or an unexpected root element
pub fn parse_sitemap(xml: &str) -> Result<ParsedSitemap, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut kind: Option<DocumentKind> = None;
    let mut entries = Vec::new();
    let mut depth = 0usize;

    // Entry currently being read (depth 2) and whether we are inside its <loc>
    let mut current: Option<RawEntry> = None;
    let mut in_loc = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            format!(
                "XML error at byte {}: {}",
                reader.buffer_position(),
                e
            )
        })?;

        match event {
            Event::Start(element) => {
                depth += 1;
                let name = element.local_name();
                match depth {
                    1 => kind = Some(root_kind(name.as_ref())?),
                    2 if is_entry(kind, name.as_ref()) => {
                        current = Some(RawEntry {
                            position: entries.len(),
                            loc: None,
                        });
                    }
                    // Only the first <loc> of an entry is read
                    3 if name.as_ref() == b"loc" => {
                        if let Some(entry) = current.as_mut().filter(|e| e.loc.is_none()) {
                            entry.loc = Some(String::new());
                            in_loc = true;
                        }
                    }
                    _ => {}
                }
            }

            Event::Empty(element) => {
                let name = element.local_name();
                match depth + 1 {
                    1 => kind = Some(root_kind(name.as_ref())?),
                    2 if is_entry(kind, name.as_ref()) => entries.push(RawEntry {
                        position: entries.len(),
                        loc: None,
                    }),
                    _ => {}
                }
            }

            Event::Text(text) => {
                if in_loc {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| format!("Invalid text in <loc>: {}", e))?;
                    append_loc(&mut current, &unescaped);
                }
            }

            Event::CData(data) => {
                if in_loc {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| format!("Invalid UTF-8 in <loc>: {}", e))?;
                    append_loc(&mut current, text);
                }
            }

            Event::End(_) => {
                match depth {
                    3 => in_loc = false,
                    2 => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }

            Event::Eof => break,

            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| "Document has no root element".to_string())?;
    Ok(ParsedSitemap { kind, entries })
}

fn root_kind(name: &[u8]) -> Result<DocumentKind, String> {
    match name {
        b"urlset" => Ok(DocumentKind::UrlSet),
        b"sitemapindex" => Ok(DocumentKind::Index),
        other => Err(format!(
            "Unexpected root element <{}>, expected <urlset> or <sitemapindex>",
            String::from_utf8_lossy(other)
        )),
    }
}

fn is_entry(kind: Option<DocumentKind>, name: &[u8]) -> bool {
    matches!(
        (kind, name),
        (Some(DocumentKind::UrlSet), b"url") | (Some(DocumentKind::Index), b"sitemap")
    )
}

fn append_loc(current: &mut Option<RawEntry>, text: &str) {
    if let Some(loc) = current.as_mut().and_then(|entry| entry.loc.as_mut()) {
        loc.push_str(text);
    }
}
