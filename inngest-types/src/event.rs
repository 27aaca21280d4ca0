//! The Event type — the unit of data that triggers function runs.

use serde::{Deserialize, Serialize};

/// An event sent to or received from the orchestrator.
///
/// Immutable once constructed; always JSON-serializable (`data` and
/// `user` are arbitrary JSON, not a typed payload — user code downcasts
/// as needed).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// The event name, e.g. `"demo/hello.world"`.
    pub name: String,

    /// The event's payload.
    #[serde(default)]
    pub data: serde_json::Value,

    /// Optional caller-supplied user context (auth claims, etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,

    /// Milliseconds since the Unix epoch. Assigned by the orchestrator
    /// if omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,

    /// Orchestrator-assigned event id, present once the event has been
    /// received and persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Optional schema version tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<String>,
}

impl Event {
    /// Create a new event with just a name and JSON data.
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
            user: None,
            ts: None,
            id: None,
            v: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_minimal_event() {
        let e = Event::new("demo/hello.world", serde_json::json!({"a": 1}));
        let json = serde_json::to_string(&e).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }

    #[test]
    fn data_defaults_to_null_when_absent() {
        let e: Event = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(e.data, serde_json::Value::Null);
    }
}
