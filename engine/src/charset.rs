//! Byte to text decoding for fetched pages.
//!
//! Two views exist: the HTTP text (declared charset, else Latin-1 for
//! undeclared `text/*`) used for line metrics, and the HTML text (BOM, then
//! `<meta charset>`, then the header, then UTF-8, then windows-1252) that the
//! document tree is built from.

use encoding_rs::{Encoding, WINDOWS_1252};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// Labels that mean true ISO-8859-1, where 0x80-0x9F stay C1 controls.
/// `encoding_rs` folds these into windows-1252.
const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso_8859-1",
    "latin-1",
    "latin1",
    "l1",
    "8859",
    "cp819",
    "ibm819",
];

const ASCII_LABELS: &[&str] = &["ascii", "us-ascii", "646"];

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"(?i-u)<\s*meta[^>]+charset\s*=\s*["']?([^>]*?)[ /;'">]"##)
        .expect("meta charset pattern")
});

/// Minimum number of leading bytes searched for a `<meta charset>`.
const META_SCAN_MIN: usize = 2048;

/// Text view of an HTTP body as the content type declares it.
pub fn http_text(body: &[u8], content_type: Option<&str>) -> String {
    let Some(content_type) = content_type else {
        return String::from_utf8_lossy(body).into_owned();
    };

    match content_type_charset(content_type) {
        Some(label) => decode_labeled(body, &label).unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
        None if content_type.trim_start().to_ascii_lowercase().starts_with("text/") => latin1(body),
        None => String::from_utf8_lossy(body).into_owned(),
    }
}

/// Text an HTML parser should see: byte-order mark, then the document's own
/// `<meta charset>`, then the header charset, then UTF-8 when the bytes are
/// valid, else windows-1252.
pub fn html_text(body: &[u8], content_type: Option<&str>) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(body) {
        let (text, _) = encoding.decode_without_bom_handling(&body[bom_len..]);
        return text.into_owned();
    }

    let declared = meta_charset(body)
        .and_then(|label| decode_labeled(body, &label))
        .or_else(|| {
            content_type
                .and_then(content_type_charset)
                .and_then(|label| decode_labeled(body, &label))
        });
    if let Some(text) = declared {
        return text;
    }

    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(body).0.into_owned(),
    }
}

/// `charset` parameter of a content type, lowercased and unquoted.
pub fn content_type_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        let value = value.trim().trim_matches(['"', '\'']).to_ascii_lowercase();
        (key.trim().eq_ignore_ascii_case("charset") && !value.is_empty()).then_some(value)
    })
}

/// Decodes with a named charset, replacing undecodable bytes. `None` when the
/// label names no known encoding.
pub fn decode_labeled(body: &[u8], label: &str) -> Option<String> {
    let label = label.trim().to_ascii_lowercase();
    if LATIN1_LABELS.contains(&label.as_str()) {
        return Some(latin1(body));
    }
    if ASCII_LABELS.contains(&label.as_str()) {
        return Some(body.iter().map(|&b| if b.is_ascii() { b as char } else { '\u{fffd}' }).collect());
    }

    let encoding = Encoding::for_label(label.as_bytes())?;
    let (text, _) = encoding.decode_without_bom_handling(body);
    Some(text.into_owned())
}

fn meta_charset(body: &[u8]) -> Option<String> {
    let end = body.len().min(META_SCAN_MIN.max(body.len() / 20));
    let caps = META_CHARSET.captures(&body[..end])?;
    let label = std::str::from_utf8(caps.get(1)?.as_bytes()).ok()?.trim();
    (!label.is_empty()).then(|| label.to_ascii_lowercase())
}

fn latin1(body: &[u8]) -> String {
    body.iter().map(|&b| b as char).collect()
}
