//! Lookup key used to address adapter fetches and cache entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Immutable key addressing one lookup.
///
/// Two keys share a cache entry iff they are equal, including their
/// auxiliary `context` fields. `BTreeMap` keeps the context ordered so that
/// equal keys also hash and serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupKey {
    value: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    context: BTreeMap<String, String>,
}

impl LookupKey {
    /// Creates a key without auxiliary context.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            context: BTreeMap::new(),
        }
    }

    /// Adds an auxiliary context field, consumed by adapter types that need it.
    pub fn with_context(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(field.into(), value.into());
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }
}

impl From<&str> for LookupKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LookupKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_with_same_value_are_equal() {
        assert_eq!(LookupKey::from("k1"), LookupKey::new("k1".to_string()));
    }

    #[test]
    fn test_context_participates_in_equality() {
        let plain = LookupKey::new("k1");
        let scoped = LookupKey::new("k1").with_context("stream", "s1");

        assert_ne!(plain, scoped);

        let mut set = HashSet::new();
        set.insert(plain.clone());
        set.insert(scoped.clone());
        set.insert(LookupKey::new("k1"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_empty_context_is_not_serialized() {
        let json = serde_json::to_string(&LookupKey::new("k1")).unwrap();
        assert_eq!(json, r#"{"value":"k1"}"#);
    }
}
