//! MIME type classification and content sniffing.

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const PLAIN_TEXT_TYPE: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM_TYPE: &str = "application/octet-stream";

/// The media type without parameters, lowercased.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `application/json`, `text/json` and any `+json` suffix type.
pub fn is_json_type(content_type: &str) -> bool {
    let mt = media_type(content_type);
    mt.ends_with("/json") || mt.ends_with("+json")
}

/// `application/xml`, `text/xml` and any `+xml` suffix type.
pub fn is_xml_type(content_type: &str) -> bool {
    let mt = media_type(content_type);
    mt.ends_with("/xml") || mt.ends_with("+xml")
}

/// Whether a response with this content type is decoded into targets.
pub fn is_structured(content_type: &str) -> bool {
    is_json_type(content_type) || is_xml_type(content_type)
}

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"OggS\x00", "application/ogg"),
];

const HTML_TAGS: &[&str] = &[
    "<!doctype html",
    "<html",
    "<head",
    "<script",
    "<iframe",
    "<h1",
    "<div",
    "<font",
    "<table",
    "<a",
    "<style",
    "<title",
    "<b",
    "<body",
    "<br",
    "<p",
    "<!--",
];

/// Guess the content type of raw bytes from their leading signature,
/// falling back to plain text or an octet stream.
pub fn sniff(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(512)];

    if let Some((_, ct)) = SIGNATURES.iter().find(|(sig, _)| data.starts_with(sig)) {
        return *ct;
    }
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let text = String::from_utf8_lossy(&data[start..]).to_ascii_lowercase();
    if text.starts_with("<?xml") {
        return "text/xml; charset=utf-8";
    }
    let is_html = HTML_TAGS.iter().any(|tag| {
        text.strip_prefix(tag)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c == ' ' || c == '>')
    });
    if is_html {
        return "text/html; charset=utf-8";
    }

    let binary = data
        .iter()
        .any(|&b| b <= 0x08 || b == 0x0b || (0x0e..=0x1a).contains(&b) || (0x1c..=0x1f).contains(&b));
    if binary {
        OCTET_STREAM_TYPE
    } else {
        PLAIN_TEXT_TYPE
    }
}
