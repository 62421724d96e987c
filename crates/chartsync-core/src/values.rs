//! Value overrides attached to a desired release

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// Value overrides passed through to the release store
///
/// Arbitrary structured data; the only shape the store accepts is a mapping
/// (or nothing at all).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse values from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Parse values from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(json)?;
        Ok(Self(value))
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Check if there is nothing to override
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Null => true,
            JsonValue::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Render the overrides to the YAML document the release store expects
    ///
    /// Absent values render to an empty document. Anything other than a
    /// mapping at the top level is rejected.
    pub fn to_yaml(&self) -> Result<String> {
        match &self.0 {
            JsonValue::Null => Ok(String::new()),
            JsonValue::Object(_) => Ok(serde_yaml::to_string(&self.0)?),
            other => Err(CoreError::InvalidValues {
                message: format!("expected a mapping, found {}", json_kind(other)),
            }),
        }
    }
}

impl From<JsonValue> for Values {
    fn from(value: JsonValue) -> Self {
        Self(value)
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_yaml_mapping() {
        let values = Values::from(json!({"image": {"tag": "1.2.3"}, "replicas": 2}));
        let yaml = values.to_yaml().unwrap();

        let back = Values::from_yaml(&yaml).unwrap();
        assert_eq!(back, values);
        assert!(yaml.contains("tag: 1.2.3"));
    }

    #[test]
    fn test_to_yaml_null_is_empty_document() {
        let values = Values(JsonValue::Null);
        assert!(values.is_empty());
        assert_eq!(values.to_yaml().unwrap(), "");
    }

    #[test]
    fn test_to_yaml_empty_mapping() {
        let values = Values::new();
        assert!(values.is_empty());
        assert_eq!(values.to_yaml().unwrap().trim(), "{}");
    }

    #[test]
    fn test_to_yaml_rejects_sequence() {
        let values = Values::from(json!(["a", "b"]));
        let err = values.to_yaml().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid values: expected a mapping, found a sequence");
    }

    #[test]
    fn test_to_yaml_rejects_scalar() {
        let values = Values::from_yaml("just a string").unwrap();
        assert!(!values.is_empty());
        assert!(matches!(values.to_yaml(), Err(CoreError::InvalidValues { .. })));
    }

    #[test]
    fn test_from_json() {
        let values = Values::from_json(r#"{"service": {"port": 8080}}"#).unwrap();
        assert_eq!(values.inner()["service"]["port"], 8080);
    }
}
