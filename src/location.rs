//! Navigable state. The session id is the only piece of state that survives
//! outside the process, carried as `?sessionId=<id>`.

use std::collections::HashMap;

/// Query parameter holding the session id.
pub const SESSION_PARAM: &str = "sessionId";

/// Percent-decoding for URL query parameters. Invalid escapes are kept as-is.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encode everything outside the unreserved set.
pub fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Parse a query string into key-value pairs.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((url_decode(key), url_decode(val)))
        })
        .collect()
}

/// Render the navigable location for a session.
pub fn session_location(session_id: &str) -> String {
    format!("?{}={}", SESSION_PARAM, url_encode(session_id))
}

/// Pull a session id out of a full URL, a bare query string, or a bare id.
pub fn session_from_location(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match input.find('?') {
        Some(pos) => {
            let query = input[pos + 1..].split('#').next().unwrap_or("");
            parse_query(query)
                .remove(SESSION_PARAM)
                .filter(|id| !id.is_empty())
        }
        None if input.contains('=') || input.contains('/') => None,
        None => Some(input.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_decode_plus_and_percent() {
        assert_eq!(url_decode("a+b%20c"), "a b c");
    }

    #[test]
    fn test_url_decode_multibyte() {
        assert_eq!(url_decode("caf%C3%A9"), "café");
    }

    #[test]
    fn test_url_decode_bad_escape_kept() {
        assert_eq!(url_decode("100%zz"), "100%zz");
        assert_eq!(url_decode("50%"), "50%");
    }

    #[test]
    fn test_url_encode_reserved() {
        assert_eq!(url_encode("a b&c"), "a%20b%26c");
        assert_eq!(url_encode("abc-123_~."), "abc-123_~.");
    }

    #[test]
    fn test_parse_query_pairs() {
        let q = parse_query("?sessionId=abc&x=1&flag");
        assert_eq!(q.get("sessionId").map(String::as_str), Some("abc"));
        assert_eq!(q.get("x").map(String::as_str), Some("1"));
        assert_eq!(q.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn test_session_location() {
        assert_eq!(session_location("abc-1"), "?sessionId=abc-1");
    }

    #[test]
    fn test_session_from_full_url() {
        assert_eq!(
            session_from_location("http://localhost:3000/?sessionId=9f1c&tab=2#top").as_deref(),
            Some("9f1c")
        );
    }

    #[test]
    fn test_session_from_bare_id() {
        assert_eq!(session_from_location("  9f1c  ").as_deref(), Some("9f1c"));
    }

    #[test]
    fn test_session_from_url_without_param() {
        assert!(session_from_location("http://localhost:3000/?tab=2").is_none());
        assert!(session_from_location("http://localhost:3000/chat").is_none());
        assert!(session_from_location("").is_none());
    }
}
