//! Query-string encoding and decoding.
//!
//! Keys ending in `[]` denote repeated values and are collected into a list
//! under the stripped key. A key without `=` gets the literal value `"true"`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A decoded query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
    /// Skipped entirely when encoding.
    Null,
}

impl QueryValue {
    /// The single value, or the first element of a list.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::One(value) => Some(value),
            QueryValue::Many(values) => values.first().map(String::as_str),
            QueryValue::Null => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::One(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Many(values)
    }
}

/// Query parameters keyed by name, iterated in sorted key order.
pub type QueryParams = BTreeMap<String, QueryValue>;

/// Percent-decode one query component; malformed input is kept as-is.
pub fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Parse a query string (without the leading `?`).
pub fn parse(query: &str) -> QueryParams {
    let mut params = QueryParams::new();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let mut parts = pair.splitn(2, '=');
        let mut key = decode_component(parts.next().unwrap_or_default());
        let value = parts
            .next()
            .map(decode_component)
            .unwrap_or_else(|| "true".to_string());

        if key.len() > 2 && key.ends_with("[]") {
            key.truncate(key.len() - 2);
            let entry = params
                .entry(key)
                .or_insert_with(|| QueryValue::Many(Vec::new()));
            match entry {
                QueryValue::Many(values) => values.push(value),
                other => {
                    let first = other.as_str().map(str::to_string);
                    *other = QueryValue::Many(first.into_iter().chain([value]).collect());
                }
            }
        } else {
            params.insert(key, QueryValue::One(value));
        }
    }

    params
}

/// Encode parameters as `?k=v&list[]=a&list[]=b`, keys in sorted order.
///
/// Returns an empty string when there is nothing to encode.
pub fn encode(params: &QueryParams) -> String {
    let mut pairs = Vec::new();

    for (key, value) in params {
        let key = urlencoding::encode(key);
        match value {
            QueryValue::One(value) => {
                pairs.push(format!("{key}={}", urlencoding::encode(value)));
            }
            QueryValue::Many(values) => {
                for value in values {
                    pairs.push(format!("{key}[]={}", urlencoding::encode(value)));
                }
            }
            QueryValue::Null => {}
        }
    }

    if pairs.is_empty() {
        return String::new();
    }
    format!("?{}", pairs.join("&"))
}

/// Decode percent escapes in a full path, leaving escapes of reserved URI
/// characters (`;/?:@&=+$,#`) untouched.
pub fn decode_uri(uri: &str) -> String {
    const RESERVED: &[u8] = b";/?:@&=+$,#";

    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex.filter(|b| !RESERVED.contains(b)) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| uri.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_scalar_and_flag() {
        let params = parse("page=2&draft");
        assert_eq!(params.get("page"), Some(&QueryValue::One("2".into())));
        assert_eq!(params.get("draft"), Some(&QueryValue::One("true".into())));
    }

    #[test]
    fn test_parse_array_keys() {
        let params = parse("tags[]=a&tags[]=b%20c&x=1");
        assert_eq!(
            params.get("tags"),
            Some(&QueryValue::Many(vec!["a".into(), "b c".into()]))
        );
        assert_eq!(params.get("x").and_then(QueryValue::as_str), Some("1"));
    }

    #[test]
    fn test_parse_decodes_keys_and_empty_values() {
        let params = parse("a%20b=&c=%26");
        assert_eq!(params.get("a b"), Some(&QueryValue::One(String::new())));
        assert_eq!(params.get("c"), Some(&QueryValue::One("&".into())));
    }

    #[test]
    fn test_encode_sorts_and_skips_null() {
        let mut params = QueryParams::new();
        params.insert("z".into(), "last".into());
        params.insert("a".into(), vec!["1".to_string(), "2".to_string()].into());
        params.insert("m".into(), QueryValue::Null);

        assert_eq!(encode(&params), "?a[]=1&a[]=2&z=last");
    }

    #[test]
    fn test_encode_empty_is_blank() {
        assert_eq!(encode(&QueryParams::new()), "");

        let mut only_null = QueryParams::new();
        only_null.insert("gone".into(), QueryValue::Null);
        assert_eq!(encode(&only_null), "");
    }

    #[test]
    fn test_encode_percent_encodes_values() {
        let mut params = QueryParams::new();
        params.insert("q".into(), "a b&c".into());
        assert_eq!(encode(&params), "?q=a%20b%26c");
    }

    #[test]
    fn test_decode_uri_keeps_reserved_escapes() {
        assert_eq!(decode_uri("/a%20b"), "/a b");
        assert_eq!(decode_uri("/a%2Fb"), "/a%2Fb");
        assert_eq!(decode_uri("/a%3Fb"), "/a%3Fb");
        assert_eq!(decode_uri("/100%"), "/100%");
    }

    #[test]
    fn test_bare_array_key_is_a_list_flag() {
        let params = parse("x[]&x[]=b");
        assert_eq!(
            params.get("x"),
            Some(&QueryValue::Many(vec!["true".into(), "b".into()]))
        );
        assert!(!params.contains_key("x[]"));

        let reparsed = parse(encode(&params).trim_start_matches('?'));
        assert_eq!(reparsed, params);
    }

    proptest! {
        #[test]
        fn prop_parse_encode_is_stable(
            pairs in proptest::collection::vec(
                ("[a-c]{1,3}", any::<bool>(), proptest::option::of("[a-zA-Z0-9 &=%\\[\\]]{0,8}")),
                0..8,
            )
        ) {
            // A small key alphabet makes repeated keys and scalar/list mixes common.
            let raw = pairs
                .iter()
                .map(|(k, list, v)| {
                    let key = if *list { format!("{k}[]") } else { k.clone() };
                    match v {
                        Some(v) => format!("{key}={}", urlencoding::encode(v)),
                        None => key,
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            let parsed = parse(&raw);
            let encoded = encode(&parsed);
            let reparsed = parse(encoded.trim_start_matches('?'));
            prop_assert_eq!(reparsed, parsed);
        }
    }
}
