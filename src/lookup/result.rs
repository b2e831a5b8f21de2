//! Value returned by every resolution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Outcome of a lookup: a resolved value or an authoritative "not found".
///
/// `has_result = false` is a successful answer, distinct from a failed fetch
/// (which is a [`crate::lookup::LookupError`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    has_result: bool,
    single_value: Option<Value>,
    multi_value: Option<Map<String, Value>>,
    #[serde(rename = "cache_ttl_ms", default, with = "optional_millis")]
    cache_ttl: Option<Duration>,
}

impl LookupResult {
    /// The explicit "not found" result.
    pub fn empty() -> Self {
        Self {
            has_result: false,
            single_value: None,
            multi_value: None,
            cache_ttl: None,
        }
    }

    pub fn single(value: impl Into<Value>) -> Self {
        Self {
            has_result: true,
            single_value: Some(value.into()),
            multi_value: None,
            cache_ttl: None,
        }
    }

    pub fn multi(values: Map<String, Value>) -> Self {
        Self {
            has_result: true,
            single_value: None,
            multi_value: Some(values),
            cache_ttl: None,
        }
    }

    pub fn single_and_multi(single: impl Into<Value>, values: Map<String, Value>) -> Self {
        Self {
            has_result: true,
            single_value: Some(single.into()),
            multi_value: Some(values),
            cache_ttl: None,
        }
    }

    /// Builds a result from optional parts; it has a result iff either is set.
    pub fn from_parts(single: Option<Value>, multi: Option<Map<String, Value>>) -> Self {
        Self {
            has_result: single.is_some() || multi.is_some(),
            single_value: single,
            multi_value: multi,
            cache_ttl: None,
        }
    }

    /// Attaches a time-to-live hint honoured by caches that retain results.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn has_result(&self) -> bool {
        self.has_result
    }

    pub fn is_empty(&self) -> bool {
        !self.has_result
    }

    pub fn single_value(&self) -> Option<&Value> {
        self.single_value.as_ref()
    }

    pub fn multi_value(&self) -> Option<&Map<String, Value>> {
        self.multi_value.as_ref()
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl
    }
}

/// Serializes an optional [`Duration`] as whole milliseconds.
mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_has_no_result() {
        let result = LookupResult::empty();
        assert!(!result.has_result());
        assert!(result.is_empty());
        assert!(result.single_value().is_none());
        assert!(result.multi_value().is_none());
    }

    #[test]
    fn test_single_value() {
        let result = LookupResult::single("v1");
        assert!(result.has_result());
        assert_eq!(result.single_value(), Some(&json!("v1")));
    }

    #[test]
    fn test_multi_value_keeps_entries() {
        let mut values = Map::new();
        values.insert("country".to_string(), json!("DE"));
        values.insert("asn".to_string(), json!(3320));

        let result = LookupResult::single_and_multi("DE", values);
        assert_eq!(result.multi_value().unwrap().len(), 2);
        assert_eq!(result.single_value(), Some(&json!("DE")));
    }

    #[test]
    fn test_ttl_serialized_as_millis() {
        let result = LookupResult::single(42).with_cache_ttl(Duration::from_secs(2));
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["has_result"], json!(true));
        assert_eq!(value["single_value"], json!(42));
        assert_eq!(value["cache_ttl_ms"], json!(2000));

        let back: LookupResult = serde_json::from_value(value).unwrap();
        assert_eq!(back.cache_ttl(), Some(Duration::from_secs(2)));
    }
}
