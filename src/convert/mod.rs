//! Content conversion
//!
//! Turns fetched HTML into clean markdown text and picks a title for the page.

mod markdown;
mod title;

pub use markdown::{ConvertedPage, HtmlConverter, DEFAULT_REMOVE_TAGS};
pub use title::{extract_title, title_from_url};
