//! Event payloads and shared helpers: timestamps and thread identity.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Description of a failed operation, carried by `Error` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureInfo {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
}

/// The value attached to a published event.
///
/// Subscribers must handle every variant; producers make no promise about
/// which one a given key carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EventPayload {
    /// Pure signal, no data. Used for `Start`.
    Empty,
    /// Numeric value, e.g. elapsed milliseconds.
    Number(u64),
    /// Free-text message.
    Text(String),
    /// Structured key/value mapping.
    Record(Map<String, Value>),
    /// Error description.
    Failure(FailureInfo),
}

impl EventPayload {
    /// Map a serialized operation result onto a payload. `Null` maps to
    /// `Empty` (callers treat it as "nothing to publish"); anything that is
    /// neither a string nor an object is carried as its JSON rendering.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => EventPayload::Empty,
            Value::String(text) => EventPayload::Text(text),
            Value::Object(map) => EventPayload::Record(map),
            other => EventPayload::Text(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, EventPayload::Empty)
    }
}

/// Current UTC time as RFC 3339 with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Identity of the executing thread: its name, or its id when unnamed.
pub fn thread_label() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_result_maps_to_empty() {
        assert!(EventPayload::from_value(Value::Null).is_empty());
    }

    #[test]
    fn string_result_maps_to_text() {
        let payload = EventPayload::from_value(json!("Success"));
        assert_eq!(payload, EventPayload::Text("Success".to_string()));
    }

    #[test]
    fn object_result_maps_to_record() {
        let payload = EventPayload::from_value(json!({ "rows": 3 }));
        match payload {
            EventPayload::Record(map) => assert_eq!(map["rows"], json!(3)),
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn scalar_result_maps_to_json_text() {
        let payload = EventPayload::from_value(json!(42));
        assert_eq!(payload, EventPayload::Text("42".to_string()));
    }

    #[test]
    fn timestamp_is_iso_8601_with_milliseconds() {
        let ts = now_rfc3339();
        let parsed = chrono::DateTime::parse_from_rfc3339(&ts).unwrap();
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
        assert!(parsed.timestamp_subsec_millis() <= 999);
    }
}
