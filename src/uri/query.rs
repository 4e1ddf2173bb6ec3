use std::collections::BTreeMap;

use serde::Serialize;

use super::error::UriError;
use super::escape::{unescape_str, Component};

/// Query parameters keyed by name, each with its values in input order
///
/// Keys are held sorted so that every rendering of a map is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryMap {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryMap {
    /// Parses a raw (still encoded) query string such as `a=1&b=2&a=3`
    ///
    /// Empty segments are skipped and a segment without `=` yields an empty
    /// value. Any `;` inside a segment or a malformed escape rejects the
    /// whole query.
    pub fn parse(raw_query: &str) -> Result<Self, UriError> {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for segment in raw_query.split('&') {
            if segment.contains(';') {
                return Err(UriError::SemicolonSeparator);
            }
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            let key = unescape_str(key, Component::QueryComponent)?;
            let value = unescape_str(value, Component::QueryComponent)?;
            params.entry(key).or_default().push(value);
        }

        Ok(Self { params })
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Values recorded for `key`, in input order
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Every value of every key, flattened
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.params.values().flatten().map(String::as_str)
    }

    pub fn into_keys(self) -> impl Iterator<Item = String> {
        self.params.into_keys()
    }

    pub fn into_values(self) -> impl Iterator<Item = String> {
        self.params.into_values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_keep_order() {
        let map = QueryMap::parse("x=1&y=3&x=2").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("x").unwrap(), ["1", "2"]);
        assert_eq!(map.get("y").unwrap(), ["3"]);
        assert_eq!(map.values().count(), 3);
    }

    #[test]
    fn test_decoding() {
        let map = QueryMap::parse("q=hello+world&path=%2Fetc%2Fpasswd&flag").unwrap();
        assert_eq!(map.get("q").unwrap(), ["hello world"]);
        assert_eq!(map.get("path").unwrap(), ["/etc/passwd"]);
        assert_eq!(map.get("flag").unwrap(), [""]);
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let map = QueryMap::parse("&&a=1&").unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a"]);
        assert!(QueryMap::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_semicolon_is_rejected() {
        assert_eq!(
            QueryMap::parse("a=1;b=2"),
            Err(UriError::SemicolonSeparator)
        );
    }

    #[test]
    fn test_bad_escape_is_rejected() {
        assert!(matches!(
            QueryMap::parse("a=%zz"),
            Err(UriError::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_serializes_as_object_of_arrays() {
        let map = QueryMap::parse("b=2&a=1&a=3").unwrap();
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"a":["1","3"],"b":["2"]}"#
        );
    }
}
