//! Storage path normalization.
//!
//! Jobs may reference their source document by download URL, by
//! `scheme://bucket/key` URI or by bare object key. Everything is reduced to
//! the bare object key before it reaches the object store. Normalization
//! never fails: input that cannot be interpreted is returned as given.

/// Separates the bucket prefix from the encoded object key in download URLs.
const OBJECT_MARKER: &str = "/o/";

pub fn normalize(value: &str) -> String {
    if is_http_url(value) {
        return match value.split_once(OBJECT_MARKER) {
            Some((_, rest)) => {
                let key = rest.split_once('?').map_or(rest, |(key, _)| key);
                percent_decode(key)
            }
            None => value.to_string(),
        };
    }

    if let Some((_, rest)) = value.split_once("://") {
        return match rest.split_once('/') {
            Some((_bucket, key)) if !key.is_empty() => key.to_string(),
            _ => value.to_string(),
        };
    }

    value.to_string()
}

/// URL schemes are case-insensitive, so `HTTPS://` counts as a download URL.
fn is_http_url(value: &str) -> bool {
    let has_scheme = |scheme: &str| {
        value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    };
    has_scheme("http://") || has_scheme("https://")
}

/// Decodes `%XX` escapes. Malformed escapes are kept literally and invalid
/// UTF-8 is replaced rather than rejected.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push(high << 4 | low);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Encodes everything except unreserved characters, `/` included, the way
/// object keys appear inside download URLs.
pub fn percent_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
