//! Character encoding detection and transcoding to UTF-8

use crate::convert::ConvertError;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use regex::Regex;
use std::sync::OnceLock;

/// Bytes scanned for a `<meta>` charset declaration
const META_PRESCAN_BYTES: usize = 1024;

fn meta_charset_regex() -> &'static Regex {
    static META_CHARSET: OnceLock<Regex> = OnceLock::new();
    META_CHARSET.get_or_init(|| {
        // covers <meta charset=x> and the http-equiv content="...; charset=x" form
        Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#)
            .expect("meta charset pattern is valid")
    })
}

/// Decodes an HTML body to UTF-8
///
/// Detection order: byte-order mark, `<meta>` declaration in the first
/// 1024 bytes, `charset` parameter of the Content-Type header, valid UTF-8,
/// then statistical detection. A declared charset that is not recognized
/// is an error.
pub fn decode_html(bytes: &[u8], content_type: &str) -> Result<String, ConvertError> {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        return Ok(decode_with(encoding, &bytes[bom_length..]));
    }

    if let Some(label) = sniff_meta_charset(bytes) {
        let encoding = lookup(&label)?;
        // a UTF-16 declaration inside ASCII-compatible markup means UTF-8
        let encoding = if encoding == UTF_16LE || encoding == UTF_16BE {
            UTF_8
        } else {
            encoding
        };
        return Ok(decode_with(encoding, bytes));
    }

    decode_declared_or_detected(bytes, content_type)
}

/// Decodes a plain-text body (Markdown, link lists) to UTF-8
///
/// Same as [`decode_html`] without the `<meta>` prescan.
pub fn decode_text(bytes: &[u8], content_type: &str) -> Result<String, ConvertError> {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        return Ok(decode_with(encoding, &bytes[bom_length..]));
    }

    decode_declared_or_detected(bytes, content_type)
}

fn decode_declared_or_detected(bytes: &[u8], content_type: &str) -> Result<String, ConvertError> {
    if let Some(label) = content_type_charset(content_type) {
        return Ok(decode_with(lookup(&label)?, bytes));
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    tracing::trace!("Detected encoding {}", encoding.name());

    Ok(decode_with(encoding, bytes))
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

fn lookup(label: &str) -> Result<&'static Encoding, ConvertError> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| ConvertError::UnsupportedCharset {
        label: label.to_string(),
    })
}

/// Finds a charset declared by a `<meta>` tag near the start of the document
fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(META_PRESCAN_BYTES)];
    let head = String::from_utf8_lossy(head);
    meta_charset_regex()
        .captures(&head)
        .map(|captures| captures[1].to_string())
}

/// Extracts the `charset` parameter of a Content-Type header
fn content_type_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(['"', '\'']).to_string())
        })
        .filter(|label| !label.is_empty())
}
