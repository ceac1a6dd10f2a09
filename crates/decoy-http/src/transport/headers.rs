//! Header policy for fake transports.
//!
//! Request headers are stored with case-sensitive names, exactly as set.
//! Response headers are looked up case-insensitively, and cookie-setting
//! headers are never exposed to the caller.

use std::collections::BTreeMap;

/// Header name to value.
pub type Headers = BTreeMap<String, String>;

/// Names a real transport refuses to let application code set.
const UNSAFE_HEADERS: &[&str] = &[
    "Accept-Charset",
    "Accept-Encoding",
    "Connection",
    "Content-Length",
    "Cookie",
    "Cookie2",
    "Content-Transfer-Encoding",
    "Date",
    "Expect",
    "Host",
    "Keep-Alive",
    "Referer",
    "TE",
    "Trailer",
    "Transfer-Encoding",
    "Upgrade",
    "User-Agent",
    "Via",
];

/// Whether `name` may not be set on a request.
///
/// The fixed set is matched case-sensitively; `Sec-` and `Proxy-` prefixed
/// names are always refused.
pub fn is_unsafe_header(name: &str) -> bool {
    UNSAFE_HEADERS.contains(&name) || name.starts_with("Sec-") || name.starts_with("Proxy-")
}

/// Set `name`, comma-joining with an existing non-empty value.
pub(crate) fn append(headers: &mut Headers, name: &str, value: &str) {
    match headers.get_mut(name) {
        Some(existing) if !existing.is_empty() => {
            existing.push(',');
            existing.push_str(value);
        }
        _ => {
            headers.insert(name.to_string(), value.to_string());
        }
    }
}

/// Force a UTF-8 charset on the request content type, defaulting to plain text.
pub(crate) fn normalize_content_type(headers: &mut Headers) {
    let normalized = match headers.get("Content-Type").filter(|v| !v.is_empty()) {
        Some(value) => {
            let media_type = value.split(';').next().unwrap_or_default();
            format!("{media_type};charset=utf-8")
        }
        None => "text/plain;charset=utf-8".to_string(),
    };
    headers.insert("Content-Type".to_string(), normalized);
}

fn is_hidden(name: &str) -> bool {
    name.eq_ignore_ascii_case("Set-Cookie") || name.eq_ignore_ascii_case("Set-Cookie2")
}

/// Case-insensitive lookup that never reveals cookie-setting headers.
pub(crate) fn find<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    if is_hidden(name) {
        return None;
    }
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Render every visible header as `"Name: value\r\n"`.
pub(crate) fn format_all(headers: &Headers) -> String {
    headers
        .iter()
        .filter(|(name, _)| !is_hidden(name))
        .map(|(name, value)| format!("{name}: {value}\r\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_headers() {
        assert!(is_unsafe_header("Cookie"));
        assert!(is_unsafe_header("Sec-Fetch-Mode"));
        assert!(is_unsafe_header("Proxy-Authorization"));
        assert!(!is_unsafe_header("cookie"));
        assert!(!is_unsafe_header("X-Requested-With"));
    }

    #[test]
    fn test_append_comma_joins() {
        let mut headers = Headers::new();
        append(&mut headers, "Accept", "text/html");
        append(&mut headers, "Accept", "application/json");
        assert_eq!(headers["Accept"], "text/html,application/json");
    }

    #[test]
    fn test_normalize_content_type() {
        let mut headers = Headers::new();
        normalize_content_type(&mut headers);
        assert_eq!(headers["Content-Type"], "text/plain;charset=utf-8");

        headers.insert("Content-Type".into(), "application/json; charset=latin1".into());
        normalize_content_type(&mut headers);
        assert_eq!(headers["Content-Type"], "application/json;charset=utf-8");
    }

    #[test]
    fn test_find_hides_cookies() {
        let mut headers = Headers::new();
        headers.insert("Content-Type".into(), "text/plain".into());
        headers.insert("Set-Cookie".into(), "a=1".into());

        assert_eq!(find(&headers, "content-type"), Some("text/plain"));
        assert_eq!(find(&headers, "set-cookie"), None);
        assert_eq!(format_all(&headers), "Content-Type: text/plain\r\n");
    }
}
