use std::sync::LazyLock;

use regex::Regex;

static ANGLE_ADDR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(.+?)>").expect("valid regex"));

static BARE_ADDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub address: String,
    pub name: String,
}

/// Splits a `From` header value into address and display name.
///
/// The address is the text inside the first non-blank `<...>`, else the first bare
/// address found, else the whole trimmed value. The display name is whatever
/// precedes the address, unquoted; it falls back to the address.
pub fn parse_from_header(value: &str) -> ParsedAddress {
    let bracketed = ANGLE_ADDR.captures_iter(value).find_map(|c| {
        let inner = c[1].trim();
        let start = c.get(0).map_or(0, |m| m.start());
        (!inner.is_empty()).then(|| (inner.to_string(), start))
    });

    let (address, name_end) = if let Some(found) = bracketed {
        found
    } else if let Some(m) = BARE_ADDR.find(value) {
        (m.as_str().to_string(), m.start())
    } else {
        (value.trim().to_string(), 0)
    };

    let name = clean_display_name(&value[..name_end]);
    let name = if name.is_empty() { address.clone() } else { name };

    ParsedAddress { address, name }
}

/// Aggregation key for an address.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

fn clean_display_name(raw: &str) -> String {
    let unquoted = raw.replace('"', "");
    let trimmed = unquoted.trim();
    if trimmed.contains("=?") {
        decode_mime_words(trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Decodes RFC 2047 encoded words such as `=?UTF-8?B?...?=`.
fn decode_mime_words(raw: &str) -> String {
    let mut line = b"X: ".to_vec();
    line.extend_from_slice(raw.as_bytes());
    line.extend_from_slice(b"\r\n");

    match mailparse::parse_header(&line) {
        Ok((h, _idx)) => h.get_value().trim().to_string(),
        Err(_) => raw.to_string(),
    }
}
