//! Case-insensitive, last-write-wins key/value lists.
//!
//! Headers, query parameters and form fields all share the same merge rules:
//! keys compare case-insensitively, a later `set` replaces the earlier value
//! (and spelling) but keeps the key's original position, and request-level
//! values override client-level ones.

use url::form_urlencoded;

/// An ordered set of string key/value pairs with case-insensitive keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => self.entries[i] = (key, value),
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Apply every entry of `other` on top of `self`.
    pub fn merge(&mut self, other: &Params) {
        for (k, v) in other.iter() {
            self.set(k, v);
        }
    }

    /// `application/x-www-form-urlencoded` rendering with keys sorted, so the
    /// same parameters always produce the same string.
    pub fn encode(&self) -> String {
        encode_pairs(self.iter())
    }

    /// Parse a raw `a=1&b=2` string. Malformed escapes are kept literally.
    pub fn parse(query: &str) -> Self {
        form_urlencoded::parse(query.trim().trim_start_matches('?').as_bytes())
            .filter(|(k, _)| !k.is_empty())
            .collect()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

/// Encode pairs that may repeat a key. The sort is stable, so repeated keys
/// keep their relative order.
pub(crate) fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut sorted: Vec<_> = pairs.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(sorted)
        .finish()
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Params {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}
