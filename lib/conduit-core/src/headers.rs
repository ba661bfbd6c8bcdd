//! Request and response headers.
//!
//! [`Headers`] keeps entries in insertion order and stores names exactly as
//! written, while every lookup compares names ASCII-case-insensitively.
//! Inserting a name that already exists under another casing replaces that
//! entry in place: the stored spelling becomes the one of the last writer.
//!
//! [`HeaderConfig`] is the layered form found in a
//! [`RequestConfig`](crate::RequestConfig): headers common to every method,
//! per-method groups, and the explicit headers of one request.

use std::collections::HashMap;

use crate::Method;

/// Name of the `Content-Type` header.
pub const CONTENT_TYPE: &str = "Content-Type";
/// Name of the `Accept` header.
pub const ACCEPT: &str = "Accept";
/// Name of the `Authorization` header.
pub const AUTHORIZATION: &str = "Authorization";

/// Ordered header map with case-insensitive lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Value of a header, looked up case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if the header is present under any casing.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Insert or replace a header, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => {
                let slot = self.entries.get_mut(index)?;
                let (_, previous) = std::mem::replace(slot, (name, value));
                Some(previous)
            }
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Add a value to a header, joining it onto an existing entry with `", "`.
    ///
    /// The stored name keeps the casing of its first writer.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name).and_then(|index| self.entries.get_mut(index)) {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Insert a header only if no header with that name exists yet.
    ///
    /// Returns `true` if the header was inserted.
    pub fn set_if_unset(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    /// Remove a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.position(name)?;
        Some(self.entries.remove(index).1)
    }

    /// Overlay `other` on top of `self`; entries of `other` win.
    pub fn extend_from(&mut self, other: &Self) {
        for (name, value) in &other.entries {
            self.insert(name.clone(), value.clone());
        }
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Layered headers of a request configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderConfig {
    /// Headers sent with every method.
    pub common: Headers,
    /// Headers sent only with a given method.
    pub per_method: HashMap<Method, Headers>,
    /// Explicit headers of this request.
    pub request: Headers,
}

impl HeaderConfig {
    /// Create an empty header configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers for one method group, if any.
    #[must_use]
    pub fn for_method(&self, method: Method) -> Option<&Headers> {
        self.per_method.get(&method)
    }

    /// Mutable headers for one method group, created on demand.
    pub fn for_method_mut(&mut self, method: Method) -> &mut Headers {
        self.per_method.entry(method).or_default()
    }

    /// Merge `other` over `self`, one level deep: every tier merges key-wise
    /// and the right-hand side wins.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.common.extend_from(&other.common);
        for (method, headers) in &other.per_method {
            merged.for_method_mut(*method).extend_from(headers);
        }
        merged.request.extend_from(&other.request);
        merged
    }

    /// Collapse the tiers for `method`: common < per-method < request.
    #[must_use]
    pub fn flatten(&self, method: Method) -> Headers {
        let mut flat = self.common.clone();
        if let Some(group) = self.for_method(method) {
            flat.extend_from(group);
        }
        flat.extend_from(&self.request);
        flat
    }
}

impl From<Headers> for HeaderConfig {
    fn from(request: Headers) -> Self {
        Self {
            request,
            ..Self::default()
        }
    }
}
