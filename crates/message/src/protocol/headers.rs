//! Case-insensitive, order-preserving header storage.
//!
//! [`HeaderCollection`] maps a lowercased header name to the ordered list of its values.
//! The collection is immutable: `with`, `with_added` and `without` all hand back a new
//! collection and leave the receiver alone, so a message and the message derived from it can
//! keep sharing the same collection until one of them actually changes a header.

use std::fmt;

use triomphe::Arc;

/// Header values supplied by a caller, either a single scalar or a sequence.
///
/// A scalar is normalized into a one-element sequence, so every stored header
/// is a list of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderValues(Vec<String>);

impl HeaderValues {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for HeaderValues {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for HeaderValues {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<&String> for HeaderValues {
    fn from(value: &String) -> Self {
        Self(vec![value.clone()])
    }
}

impl From<Vec<String>> for HeaderValues {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<Vec<&str>> for HeaderValues {
    fn from(values: Vec<&str>) -> Self {
        Self(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for HeaderValues {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().map(|v| (*v).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for HeaderValues {
    fn from(values: [&str; N]) -> Self {
        Self(values.iter().map(|v| (*v).to_string()).collect())
    }
}

impl From<&[String]> for HeaderValues {
    fn from(values: &[String]) -> Self {
        Self(values.to_vec())
    }
}

/// Folds a header name into the form used as the storage key.
#[inline]
pub(crate) fn normalize_name(name: &str) -> String {
    if name.is_ascii() { name.to_ascii_lowercase() } else { name.to_lowercase() }
}

#[inline]
fn name_matches(key: &str, name: &str) -> bool {
    if name.is_ascii() { key.eq_ignore_ascii_case(name) } else { key == name.to_lowercase() }
}

/// An immutable, case-insensitive multimap of header names to values.
///
/// Distinct names enumerate in the order they were first inserted, and the values of one
/// name keep their insertion order.
#[derive(Clone)]
pub struct HeaderCollection {
    entries: Arc<Vec<(String, Vec<String>)>>,
}

impl Default for HeaderCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderCollection {
    pub fn new() -> Self {
        Self { entries: Arc::new(Vec::new()) }
    }

    /// Returns the values stored under `name`, or an empty slice.
    pub fn get(&self, name: &str) -> &[String] {
        self.position(name).map_or(&[], |index| self.entries[index].1.as_slice())
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns the values of `name` joined by `", "`, or an empty string.
    pub fn line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Returns a collection where `name` holds exactly `values`.
    ///
    /// An already present name keeps its enumeration slot.
    #[must_use]
    pub fn with(&self, name: &str, values: impl Into<HeaderValues>) -> Self {
        let values = values.into().into_vec();
        let mut entries = self.entries.as_ref().clone();
        match self.position(name) {
            Some(index) => entries[index].1 = values,
            None => entries.push((normalize_name(name), values)),
        }
        Self { entries: Arc::new(entries) }
    }

    /// Returns a collection where `values` are appended to those already held by `name`.
    #[must_use]
    pub fn with_added(&self, name: &str, values: impl Into<HeaderValues>) -> Self {
        let values = values.into().into_vec();
        let mut entries = self.entries.as_ref().clone();
        match self.position(name) {
            Some(index) => entries[index].1.extend(values),
            None => entries.push((normalize_name(name), values)),
        }
        Self { entries: Arc::new(entries) }
    }

    /// Returns a collection without `name`; the same collection is shared when it is absent.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        let Some(index) = self.position(name) else {
            return self.clone();
        };
        let mut entries = self.entries.as_ref().clone();
        entries.remove(index);
        Self { entries: Arc::new(entries) }
    }

    /// Like [`HeaderCollection::with`] but moves `name` to the front of the enumeration order.
    #[must_use]
    pub(crate) fn with_first(&self, name: &str, values: impl Into<HeaderValues>) -> Self {
        let mut entries = self.entries.as_ref().clone();
        if let Some(index) = self.position(name) {
            entries.remove(index);
        }
        entries.insert(0, (normalize_name(name), values.into().into_vec()));
        Self { entries: Arc::new(entries) }
    }

    /// Iterates `(normalized-name, values)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Copies the collection out as ordered `(normalized-name, values)` pairs.
    pub fn to_array(&self) -> Vec<(String, Vec<String>)> {
        self.entries.as_ref().clone()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when both collections share the same storage.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.entries, &other.entries)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(key, _)| name_matches(key, name))
    }
}

/// Builds a collection from `(name, values)` pairs; names that fold to the same key are merged.
impl<N, V> FromIterator<(N, V)> for HeaderCollection
where
    N: AsRef<str>,
    V: Into<HeaderValues>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        for (name, values) in iter {
            let name = normalize_name(name.as_ref());
            let values = values.into().into_vec();
            match entries.iter_mut().find(|(key, _)| *key == name) {
                Some((_, existing)) => existing.extend(values),
                None => entries.push((name, values)),
            }
        }
        Self { entries: Arc::new(entries) }
    }
}

impl PartialEq for HeaderCollection {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || self.entries == other.entries
    }
}

impl Eq for HeaderCollection {}

impl fmt::Debug for HeaderCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let headers: HeaderCollection = [("Content-Type", "text/html")].into_iter().collect();

        assert_eq!(headers.get("content-type"), ["text/html"]);
        assert_eq!(headers.get("CONTENT-TYPE"), ["text/html"]);
        assert!(headers.has("Content-type"));
        assert!(!headers.has("accept"));
        assert!(headers.get("accept").is_empty());
    }

    #[test]
    fn scalar_is_normalized_to_sequence() {
        let headers = HeaderCollection::new().with("X-Foo", "bar");
        assert_eq!(headers.to_array(), vec![("x-foo".to_string(), vec!["bar".to_string()])]);
    }

    #[test]
    fn with_overwrites_in_place() {
        let headers = HeaderCollection::new().with("a", "1").with("b", "2").with("A", ["3", "4"]);

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(headers.get("a"), ["3", "4"]);
    }

    #[test]
    fn with_added_appends() {
        let headers = HeaderCollection::new().with("Accept", "text/html").with_added("ACCEPT", "application/json");

        assert_eq!(headers.get("accept"), ["text/html", "application/json"]);
        assert_eq!(headers.line("accept"), "text/html, application/json");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn with_added_creates_missing() {
        let headers = HeaderCollection::new().with_added("X-New", vec!["a", "b"]);
        assert_eq!(headers.get("x-new"), ["a", "b"]);
    }

    #[test]
    fn without_removes_any_casing() {
        let headers = HeaderCollection::new().with("X-Foo", "bar").with("X-Baz", "qux");
        let removed = headers.without("x-FOO");

        assert!(!removed.has("x-foo"));
        assert!(removed.has("x-baz"));
        assert!(headers.has("x-foo"));
    }

    #[test]
    fn without_absent_shares_storage() {
        let headers = HeaderCollection::new().with("X-Foo", "bar");
        let same = headers.without("x-missing");
        assert!(HeaderCollection::ptr_eq(&headers, &same));
    }

    #[test]
    fn with_then_without_restores_original() {
        let original = HeaderCollection::new().with("a", "1");
        let restored = original.with("b", "2").without("B");
        assert_eq!(restored.to_array(), original.to_array());
    }

    #[test]
    fn mutation_never_touches_receiver() {
        let original = HeaderCollection::new().with("a", "1");
        let _ = original.with("a", "2");
        let _ = original.with_added("a", "3");
        let _ = original.without("a");
        assert_eq!(original.get("a"), ["1"]);
    }

    #[test]
    fn with_first_moves_to_front() {
        let headers = HeaderCollection::new().with("accept", "*/*").with("host", "old");
        let moved = headers.with_first("Host", "new");

        let pairs = moved.to_array();
        assert_eq!(pairs[0], ("host".to_string(), vec!["new".to_string()]));
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn from_iter_merges_folded_names() {
        let headers: HeaderCollection = [("X-Foo", "a"), ("x-foo", "b")].into_iter().collect();
        assert_eq!(headers.get("X-FOO"), ["a", "b"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn non_ascii_names_fold() {
        let headers = HeaderCollection::new().with("X-Ÿ", "1");
        assert_eq!(headers.get("x-ÿ"), ["1"]);
    }
}
