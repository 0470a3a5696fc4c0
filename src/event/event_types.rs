//! Security event and search filter types

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::utils::SourceError;

/// A single event as returned by the event source.
///
/// The body is kept as an opaque JSON object; only `id` is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SecurityEvent {
    #[serde(skip)]
    id: i64,
    fields: Map<String, Value>,
}

impl SecurityEvent {
    /// Build an event from a raw JSON value.
    ///
    /// # Errors
    /// Returns `SourceError::Parse` if the value is not an object or has no integer `id`.
    pub fn from_value(value: Value) -> Result<Self, SourceError> {
        let fields = match value {
            Value::Object(map) => map,
            other => {
                return Err(SourceError::Parse(format!(
                    "expected event object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let id = fields
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| SourceError::Parse("event is missing an integer id".to_string()))?;

        Ok(Self { id, fields })
    }

    /// Event identifier, captured before any redaction.
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// Render the event as JSON text indented by four spaces, keeping the
    /// upstream field order.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.fields.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(<serde_json::Error as serde::ser::Error>::custom)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Query-time constraint: filter key to accepted values.
///
/// Sent unmodified as the body of every search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchFilter(BTreeMap<String, Vec<Value>>);

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a filter from a JSON object such as `{"status": ["OPEN"]}`
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Add accepted values for a key
    pub fn with<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.0
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&[Value]> {
        self.0.get(key).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_capture_id_from_event_object() {
        // Arrange
        let raw = json!({"id": 42, "type": "STATIC_ANALYSIS"});

        // Act
        let event = SecurityEvent::from_value(raw).expect("valid event");

        // Assert
        assert_eq!(event.id(), 42);
        assert_eq!(event.fields().get("type"), Some(&json!("STATIC_ANALYSIS")));
    }

    #[test]
    fn should_reject_event_without_id() {
        // Arrange
        let raw = json!({"type": "RANSOMWARE_FILE_ENCRYPTION"});

        // Act
        let result = SecurityEvent::from_value(raw);

        // Assert
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn should_reject_event_with_string_id() {
        // Arrange
        let raw = json!({"id": "17"});

        // Act
        let result = SecurityEvent::from_value(raw);

        // Assert
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn should_reject_non_object_event() {
        // Act
        let result = SecurityEvent::from_value(json!([1, 2, 3]));

        // Assert
        match result {
            Err(SourceError::Parse(msg)) => assert!(msg.contains("array")),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn should_serialize_as_plain_object() {
        // Arrange
        let event = SecurityEvent::from_value(json!({"id": 5, "type": "Y"})).unwrap();

        // Act
        let value = serde_json::to_value(&event).unwrap();

        // Assert
        assert_eq!(value, json!({"id": 5, "type": "Y"}));
    }

    #[test]
    fn should_render_indented_json() {
        // Arrange
        let event = SecurityEvent::from_value(json!({"id": 5})).unwrap();

        // Act
        let text = event.to_pretty_json().unwrap();

        // Assert
        assert_eq!(text, "{\n    \"id\": 5\n}");
    }

    #[test]
    fn should_render_fields_in_upstream_order() {
        // Arrange
        let event = SecurityEvent::from_value(json!({
            "id": 7,
            "type": "STATIC_ANALYSIS",
            "device_id": 3
        }))
        .unwrap();

        // Act
        let text = event.to_pretty_json().unwrap();

        // Assert
        assert_eq!(
            text,
            "{\n    \"id\": 7,\n    \"type\": \"STATIC_ANALYSIS\",\n    \"device_id\": 3\n}"
        );
    }

    #[test]
    fn should_indent_nested_values() {
        // Arrange
        let event = SecurityEvent::from_value(json!({"id": 1, "tags": ["a"]})).unwrap();

        // Act
        let text = event.to_pretty_json().unwrap();

        // Assert
        assert_eq!(
            text,
            "{\n    \"id\": 1,\n    \"tags\": [\n        \"a\"\n    ]\n}"
        );
    }

    #[test]
    fn should_build_search_filter() {
        // Arrange & Act
        let filter = SearchFilter::new()
            .with("status", ["OPEN", "CLOSED"])
            .with("threat_severity", ["HIGH"]);

        // Assert
        assert!(!filter.is_empty());
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"status": ["OPEN", "CLOSED"], "threat_severity": ["HIGH"]})
        );
    }

    #[test]
    fn should_serialize_empty_filter_as_empty_object() {
        // Act
        let value = serde_json::to_value(SearchFilter::default()).unwrap();

        // Assert
        assert_eq!(value, json!({}));
    }

    #[test]
    fn should_parse_filter_from_json() {
        // Act
        let filter = SearchFilter::from_json(r#"{"type": ["STATIC_ANALYSIS"]}"#).unwrap();

        // Assert
        assert_eq!(filter.get("type"), Some(&[json!("STATIC_ANALYSIS")][..]));
    }
}
