//! Page title extraction

use scraper::{Html, Selector};
use url::Url;

/// Extracts a human readable title for a page
///
/// Lookup order:
/// 1. `<title>`
/// 2. the first `<h1>`
/// 3. `<meta property="og:title">`
/// 4. the last path segment of `url`, with `-`/`_` as spaces and title-cased
/// 5. the host of `url`
pub fn extract_title(document: &Html, url: &str) -> String {
    first_text(document, "title")
        .or_else(|| first_text(document, "h1"))
        .or_else(|| og_title(document))
        .unwrap_or_else(|| title_from_url(url))
}

/// Text of the first element matching `selector`, if it is not blank
fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| collapse(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn og_title(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[property="og:title"]"#).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(collapse)
        .find(|s| !s.is_empty())
}

/// Builds a title from a URL when the page has none
pub fn title_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last());

    match segment {
        Some(segment) => title_case(&segment.replace(['-', '_'], " ")),
        None => parsed.host_str().unwrap_or(url).to_string(),
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
