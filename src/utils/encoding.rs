//! Config file decoding with BOM handling and encoding detection.
//!
//! Strategy:
//! 1. A BOM (UTF-8, UTF-16 LE/BE) decides the encoding outright
//! 2. NUL bytes without a BOM mean the file is binary
//! 3. Strict UTF-8 is the fast path
//! 4. Anything else goes through chardetng and is decoded with encoding_rs

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Decoded file text plus the label of the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub content: String,
    pub encoding: &'static str,
}

/// Decode raw config bytes into text.
///
/// Returns `None` when the bytes look binary.
pub fn decode_config_bytes(bytes: &[u8]) -> Option<DecodedText> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (content, _had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return Some(DecodedText { content: content.into_owned(), encoding: encoding.name() });
    }

    if bytes.contains(&0) {
        return None;
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(DecodedText { content: text.to_string(), encoding: UTF_8.name() });
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (content, used, _had_errors) = encoding.decode(bytes);
    Some(DecodedText { content: content.into_owned(), encoding: used.name() })
}
