//! Byte-level decoding of sitemap payloads (gzip and text)

use crate::{ParseCause, ParseError, ParseResult};
use flate2::read::MultiGzDecoder;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const UTF8_BOM: &str = "\u{feff}";

/// Returns true if the payload starts with the gzip magic bytes
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Turns a raw payload into XML text
///
/// Gzip is detected by magic bytes whatever `is_gzipped` says; the flag only
/// forces decompression for payloads that claim to be gzip. Uncompressed
/// payloads that are not UTF-8 are read as latin-1.
pub fn decode_document(bytes: &[u8], is_gzipped: bool, origin: &str) -> ParseResult<String> {
    if is_gzipped || is_gzip(bytes) {
        let inflated = gunzip(bytes, origin)?;
        let text = String::from_utf8(inflated).map_err(|e| {
            ParseError::new(
                origin,
                ParseCause::Undecodable(format!("decompressed content is not UTF-8: {}", e)),
            )
        })?;
        return Ok(strip_bom(text));
    }

    Ok(match std::str::from_utf8(bytes) {
        Ok(text) => strip_bom(text.to_string()),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    })
}

fn gunzip(bytes: &[u8], origin: &str) -> ParseResult<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(bytes);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| ParseError::new(origin, ParseCause::InvalidGzip(e.to_string())))?;
    Ok(inflated)
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    }
}
