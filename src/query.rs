//! Query-string helpers.
//!
//! Two requests that differ only in parameter order or in how they escape
//! their parameters should compare equal once normalized. That is what
//! [`normalize_query_string`] is for: it is the precondition for using a
//! query string as a cache or de-duplication key.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Everything except the RFC 3986 unreserved characters
/// (`A-Z`, `a-z`, `0-9`, `-`, `_`, `.`, `~`) is escaped.
const RAW_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes `input` with the RFC 3986 unreserved set. Spaces become
/// `%20`, never `+`.
///
/// ```rust
/// use missive::query::raw_encode;
///
/// assert_eq!(raw_encode("a b&c"), "a%20b%26c");
/// ```
#[must_use]
pub fn raw_encode(input: &str) -> String {
    utf8_percent_encode(input, RAW_ENCODE_SET).to_string()
}

/// Decodes `application/x-www-form-urlencoded` text: `+` is a space and
/// `%XX` escapes are resolved. Invalid UTF-8 is replaced lossily.
///
/// ```rust
/// use missive::query::form_decode;
///
/// assert_eq!(form_decode("hello+world%21"), "hello world!");
/// assert_eq!(form_decode("1%2B1"), "1+1");
/// ```
#[must_use]
pub fn form_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Normalizes a raw query string (the part after `?`).
///
/// Segments are split on `&`. Empty segments and segments with an empty key
/// (`=orphan`) are dropped. Keys and values are form-decoded, re-encoded with
/// [`raw_encode`], and the pairs are sorted by decoded key. The sort is
/// stable, so repeated keys keep their relative order. A parameter without
/// `=` serializes as its encoded key alone.
///
/// ```rust
/// use missive::query::normalize_query_string;
///
/// assert_eq!(normalize_query_string("b=2&a=1"), "a=1&b=2");
/// assert_eq!(normalize_query_string("x=y&&=orphan"), "x=y");
/// ```
#[must_use]
pub fn normalize_query_string(query: &str) -> String {
    let mut params: Vec<(String, String)> = segments(query)
        .map(|(key, value)| {
            let key = form_decode(key);
            let encoded = match value {
                Some(value) => format!("{}={}", raw_encode(&key), raw_encode(&form_decode(value))),
                None => raw_encode(&key),
            };
            (key, encoded)
        })
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
        .into_iter()
        .map(|(_, encoded)| encoded)
        .collect::<Vec<_>>()
        .join("&")
}

/// Parses a raw query string into form-decoded `(key, value)` pairs in input
/// order. A parameter without `=` gets an empty value.
///
/// ```rust
/// use missive::query::parse_query;
///
/// let params = parse_query("q=rust+lang&page=2&flag");
/// assert_eq!(params[0], ("q".to_owned(), "rust lang".to_owned()));
/// assert_eq!(params[2], ("flag".to_owned(), String::new()));
/// ```
#[must_use]
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    segments(query)
        .map(|(key, value)| (form_decode(key), value.map(form_decode).unwrap_or_default()))
        .collect()
}

/// Non-empty `key[=value]` segments with a non-empty key.
fn segments(query: &str) -> impl Iterator<Item = (&str, Option<&str>)> {
    query
        .split('&')
        .filter(|param| !param.is_empty() && !param.starts_with('='))
        .map(|param| match param.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (param, None),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_sort_parameters_by_key() {
        assert_eq!(normalize_query_string("b=2&a=1"), "a=1&b=2");
        assert_eq!(normalize_query_string("a=1&b=2"), "a=1&b=2");
    }

    #[test]
    fn test_should_drop_empty_segments_and_empty_keys() {
        assert_eq!(normalize_query_string("x=y&&=orphan"), "x=y");
        assert_eq!(normalize_query_string("&&x=y&"), "x=y");
        assert_eq!(normalize_query_string(""), "");
        assert_eq!(normalize_query_string("=only"), "");
    }

    #[test]
    fn test_should_serialize_bare_key_without_equals() {
        assert_eq!(normalize_query_string("flag&a=1"), "a=1&flag");
        assert_eq!(normalize_query_string("empty="), "empty=");
    }

    #[test]
    fn test_should_unify_form_and_percent_encoding() {
        let plus = normalize_query_string("q=hello+world");
        let percent = normalize_query_string("q=hello%20world");
        assert_eq!(plus, "q=hello%20world");
        assert_eq!(plus, percent);

        assert_eq!(normalize_query_string("a=%7e"), "a=~");
        assert_eq!(normalize_query_string("a=1%2B1"), "a=1%2B1");
        assert_eq!(normalize_query_string("k%20y=v"), "k%20y=v");
    }

    #[test]
    fn test_should_keep_relative_order_of_repeated_keys() {
        assert_eq!(normalize_query_string("b=2&a=z&a=y"), "a=z&a=y&b=2");
    }

    #[test]
    fn test_should_sort_by_decoded_key() {
        // "%41" decodes to "A", which sorts before "B".
        assert_eq!(normalize_query_string("B=1&%41=2"), "A=2&B=1");
    }

    #[test]
    fn test_should_encode_non_ascii() {
        assert_eq!(normalize_query_string("name=J%C3%BCrgen"), "name=J%C3%BCrgen");
        assert_eq!(raw_encode("ü"), "%C3%BC");
    }

    #[test]
    fn test_should_parse_query_pairs() {
        let params = parse_query("a=1&&b=two+words&=x&c");
        assert_eq!(
            params,
            vec![
                ("a".to_owned(), "1".to_owned()),
                ("b".to_owned(), "two words".to_owned()),
                ("c".to_owned(), String::new()),
            ]
        );
    }
}
