//! XML scanning for `<urlset>` and `<sitemapindex>` documents
//!
//! The scanner is namespace aware. Entries in the standard sitemap namespace
//! are preferred; unqualified entries are only used when the document has no
//! namespaced ones. Elements bound to any other namespace (image, news and
//! video extensions) are ignored so that e.g. `<image:loc>` can never shadow
//! the page `<loc>`.

use crate::sitemap::fields::{parse_changefreq, parse_lastmod, parse_priority};
use crate::sitemap::PageDescriptor;
use crate::{ParseCause, ParseError, ParseResult};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

/// The standard sitemap schema namespace
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Namespaced,
    Plain,
    Foreign,
}

fn scope_of(resolved: &ResolveResult) -> Scope {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) if *uri == SITEMAP_NS.as_bytes() => Scope::Namespaced,
        ResolveResult::Unbound => Scope::Plain,
        _ => Scope::Foreign,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Url,
    Sitemap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    Lastmod,
    Changefreq,
    Priority,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"loc" => Some(Self::Loc),
            b"lastmod" => Some(Self::Lastmod),
            b"changefreq" => Some(Self::Changefreq),
            b"priority" => Some(Self::Priority),
            _ => None,
        }
    }
}

/// Raw text of one `<url>` or `<sitemap>` block
#[derive(Debug, Default, Clone)]
struct RawEntry {
    loc: Option<String>,
    lastmod: Option<String>,
    changefreq: Option<String>,
    priority: Option<String>,
}

impl RawEntry {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Loc => &mut self.loc,
            Field::Lastmod => &mut self.lastmod,
            Field::Changefreq => &mut self.changefreq,
            Field::Priority => &mut self.priority,
        };
        *slot = Some(value);
    }

    fn into_descriptor(self) -> Option<PageDescriptor> {
        let loc = self.loc?;
        Some(PageDescriptor {
            loc,
            lastmod: self.lastmod.as_deref().and_then(parse_lastmod),
            changefreq: self.changefreq.as_deref().and_then(parse_changefreq),
            priority: self.priority.as_deref().and_then(parse_priority),
        })
    }
}

/// Everything the scanner found, bucketed by container and scope
#[derive(Debug, Default)]
struct Scan {
    namespaced_urls: Vec<RawEntry>,
    plain_urls: Vec<RawEntry>,
    namespaced_sitemaps: Vec<RawEntry>,
    plain_sitemaps: Vec<RawEntry>,
}

impl Scan {
    fn push(&mut self, container: Container, scope: Scope, entry: RawEntry) {
        let bucket = match (container, scope) {
            (Container::Url, Scope::Namespaced) => &mut self.namespaced_urls,
            (Container::Url, _) => &mut self.plain_urls,
            (Container::Sitemap, Scope::Namespaced) => &mut self.namespaced_sitemaps,
            (Container::Sitemap, _) => &mut self.plain_sitemaps,
        };
        bucket.push(entry);
    }

    fn urls(self) -> (Vec<RawEntry>, bool) {
        let has_sitemaps = !self.namespaced_sitemaps.is_empty() || !self.plain_sitemaps.is_empty();
        let urls = if self.namespaced_urls.is_empty() {
            self.plain_urls
        } else {
            self.namespaced_urls
        };
        (urls, has_sitemaps)
    }

    fn sitemaps(self) -> Vec<RawEntry> {
        if self.namespaced_sitemaps.is_empty() {
            self.plain_sitemaps
        } else {
            self.namespaced_sitemaps
        }
    }
}

struct OpenContainer {
    kind: Container,
    scope: Scope,
    depth: usize,
    entry: RawEntry,
}

fn malformed(origin: &str, message: String) -> ParseError {
    ParseError::new(origin, ParseCause::MalformedXml(message))
}

/// Walks the whole document, failing on anything that is not well formed
fn scan(xml: &str, origin: &str) -> ParseResult<Scan> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut result = Scan::default();
    let mut open_elements: Vec<String> = Vec::new();
    let mut saw_root = false;
    let mut container: Option<OpenContainer> = None;
    let mut field: Option<(Field, String)> = None;

    loop {
        let position = reader.buffer_position();
        let (scope, event) = match reader.read_resolved_event() {
            Ok((resolved, event)) => (scope_of(&resolved), event),
            Err(e) => return Err(malformed(origin, format!("{} near byte {}", e, position))),
        };

        match event {
            Event::Start(start) => {
                if open_elements.is_empty() {
                    if saw_root {
                        return Err(malformed(origin, "multiple root elements".to_string()));
                    }
                    saw_root = true;
                }
                let local = start.local_name();
                let local = local.as_ref();
                open_elements.push(String::from_utf8_lossy(local).into_owned());
                let depth = open_elements.len();

                match &container {
                    None if scope != Scope::Foreign => {
                        let kind = match local {
                            b"url" => Some(Container::Url),
                            b"sitemap" => Some(Container::Sitemap),
                            _ => None,
                        };
                        if let Some(kind) = kind {
                            container = Some(OpenContainer {
                                kind,
                                scope,
                                depth,
                                entry: RawEntry::default(),
                            });
                        }
                    }
                    Some(open) if depth == open.depth + 1 && scope != Scope::Foreign => {
                        field = Field::from_local_name(local).map(|f| (f, String::new()));
                    }
                    _ => {}
                }
            }
            Event::Empty(_) => {
                if open_elements.is_empty() {
                    if saw_root {
                        return Err(malformed(origin, "multiple root elements".to_string()));
                    }
                    saw_root = true;
                }
            }
            Event::Text(text) => {
                if let Some((_, buffer)) = field.as_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| malformed(origin, format!("{} near byte {}", e, position)))?;
                    buffer.push_str(&unescaped);
                }
            }
            Event::CData(cdata) => {
                if let Some((_, buffer)) = field.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::End(_) => {
                let depth = open_elements.len();
                if let Some(open) = container.as_mut() {
                    if depth == open.depth + 1 {
                        if let Some((name, value)) = field.take() {
                            let value = value.trim();
                            if !value.is_empty() {
                                open.entry.set(name, value.to_string());
                            }
                        }
                    } else if depth == open.depth {
                        if let Some(done) = container.take() {
                            result.push(done.kind, done.scope, done.entry);
                        }
                    }
                }
                open_elements.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open_elements.last() {
        return Err(malformed(
            origin,
            format!("unexpected end of document, <{}> is not closed", unclosed),
        ));
    }
    if !saw_root {
        return Err(malformed(origin, "document has no root element".to_string()));
    }

    Ok(result)
}

/// Extracts page descriptors from a `<urlset>` document
///
/// Fails with [`ParseCause::SitemapIndex`] when the document has no `<url>`
/// entries but does have `<sitemap>` entries.
pub fn parse_sitemap_xml(xml: &str, origin: &str) -> ParseResult<Vec<PageDescriptor>> {
    let (urls, has_sitemaps) = scan(xml, origin)?.urls();

    if urls.is_empty() && has_sitemaps {
        return Err(ParseError::new(origin, ParseCause::SitemapIndex));
    }

    Ok(urls
        .into_iter()
        .filter_map(RawEntry::into_descriptor)
        .collect())
}

/// Extracts child sitemap URLs from a `<sitemapindex>` document
pub fn parse_index_xml(xml: &str, origin: &str) -> ParseResult<Vec<String>> {
    Ok(scan(xml, origin)?
        .sitemaps()
        .into_iter()
        .filter_map(|entry| entry.loc)
        .collect())
}
