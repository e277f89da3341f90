//! Events delivered to a machine.
//!
//! External, raised, delayed and actor-posted events all share this one
//! shape, so guards and actions cannot tell them apart.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Event type of the synthetic event that produces a machine's initial state.
pub const INIT_EVENT: &str = "statecraft.init";

/// Event type recorded on the snapshot produced by stopping a machine.
pub const STOP_EVENT: &str = "statecraft.stop";

/// Prefix of the completion events raised when a compound or parallel
/// state reaches a final configuration.
pub const DONE_STATE_PREFIX: &str = "done.state.";

/// An event: a type plus an arbitrary JSON object payload.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
///
/// let event = Event::new("PED_COUNTDOWN").with("duration", 0);
///
/// assert_eq!(event.event_type(), "PED_COUNTDOWN");
/// assert_eq!(event.get_i64("duration"), Some(0));
/// assert!(event.get("missing").is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    event_type: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    payload: Map<String, Value>,

    /// Id of the invoked actor that posted this event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
}

impl Event {
    /// Create an event with an empty payload.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: Map::new(),
            origin: None,
        }
    }

    /// Create an event from a type and a ready-made payload.
    pub fn with_payload(event_type: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            origin: None,
        }
    }

    /// Add one payload field, returning the extended event.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Tag the event with the actor that produced it.
    pub fn from_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// True for the completion events raised by final states.
    pub fn is_done_event(&self) -> bool {
        self.event_type.starts_with(DONE_STATE_PREFIX)
    }

    pub(crate) fn init() -> Self {
        Self::new(INIT_EVENT)
    }

    pub(crate) fn stop() -> Self {
        Self::new(STOP_EVENT)
    }

    pub(crate) fn done_state(node_id: &str) -> Self {
        Self::new(format!("{DONE_STATE_PREFIX}{node_id}"))
    }

    /// Event type used for a delayed transition declared on `node_id`.
    pub(crate) fn after_type(delay_ms: u64, node_id: &str) -> String {
        format!("after({delay_ms})#{node_id}")
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.event_type)
    }
}

impl From<&str> for Event {
    fn from(event_type: &str) -> Self {
        Event::new(event_type)
    }
}

impl From<String> for Event {
    fn from(event_type: String) -> Self {
        Event::new(event_type)
    }
}
