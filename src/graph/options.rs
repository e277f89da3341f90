//! Search configuration.

use crate::core::{Context, Event, State};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

type StateEvents<C> = Arc<dyn Fn(&State<C>) -> Vec<Event> + Send + Sync>;
type StateSerializer<C> = Arc<dyn Fn(&State<C>) -> String + Send + Sync>;
type EventSerializer = Arc<dyn Fn(&Event) -> String + Send + Sync>;

/// Which events to try from each state and how to fingerprint states and
/// events.
///
/// Fingerprint functions must be deterministic. Two states with the same
/// fingerprint are the same node of the search graph; two candidate events
/// with the same fingerprint are tried once.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
/// use statecraft::graph::SearchOptions;
/// use serde_json::json;
///
/// let options = SearchOptions::<()>::new()
///     .events(vec![Event::new("TIMER")])
///     .event_cases("PED_COUNTDOWN", vec![json!({"duration": 0}), json!({"duration": 1})])
///     .limit(100);
/// # let _ = options;
/// ```
pub struct SearchOptions<C: Context> {
    events: Vec<Event>,
    events_with: Option<StateEvents<C>>,
    event_cases: Vec<(String, Vec<Map<String, Value>>)>,
    serialize_state: StateSerializer<C>,
    serialize_event: EventSerializer,
    limit: Option<usize>,
}

/// Default state fingerprint: the configuration's value and the context,
/// both as JSON.
pub fn default_state_fingerprint<C: Context>(state: &State<C>) -> String {
    let context = serde_json::to_string(state.context()).unwrap_or_default();
    format!("{} | {}", state.value(), context)
}

/// Default event fingerprint: the event type, followed by the payload when
/// there is one.
pub fn default_event_fingerprint(event: &Event) -> String {
    if event.payload().is_empty() {
        return event.event_type().to_string();
    }
    let payload = serde_json::to_string(event.payload()).unwrap_or_default();
    format!("{} {}", event.event_type(), payload)
}

impl<C: Context> SearchOptions<C> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            events_with: None,
            event_cases: Vec::new(),
            serialize_state: Arc::new(default_state_fingerprint::<C>),
            serialize_event: Arc::new(default_event_fingerprint),
            limit: None,
        }
    }

    /// Events tried from every state.
    pub fn events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    /// Events computed from the state being expanded, tried after the
    /// static ones.
    pub fn events_with<F>(mut self, events: F) -> Self
    where
        F: Fn(&State<C>) -> Vec<Event> + Send + Sync + 'static,
    {
        self.events_with = Some(Arc::new(events));
        self
    }

    /// One candidate event of type `event_type` per payload. Non-object
    /// payloads are ignored.
    pub fn event_cases(mut self, event_type: impl Into<String>, payloads: Vec<Value>) -> Self {
        let payloads = payloads
            .into_iter()
            .filter_map(|payload| match payload {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.event_cases.push((event_type.into(), payloads));
        self
    }

    pub fn serialize_state<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&State<C>) -> String + Send + Sync + 'static,
    {
        self.serialize_state = Arc::new(serialize);
        self
    }

    pub fn serialize_event<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Event) -> String + Send + Sync + 'static,
    {
        self.serialize_event = Arc::new(serialize);
        self
    }

    /// Fail with [`SearchError::LimitExceeded`](super::SearchError) once
    /// more than `limit` states (or paths, for simple path search) are
    /// found.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn max(&self) -> Option<usize> {
        self.limit
    }

    pub(crate) fn state_fingerprint(&self, state: &State<C>) -> String {
        (self.serialize_state)(state)
    }

    pub(crate) fn event_fingerprint(&self, event: &Event) -> String {
        (self.serialize_event)(event)
    }

    /// Candidate events for `state`, in enumeration order, without
    /// duplicate fingerprints.
    pub(crate) fn candidates(&self, state: &State<C>) -> Vec<(String, Event)> {
        let dynamic = self
            .events_with
            .as_ref()
            .map(|events| events(state))
            .unwrap_or_default();
        let cases = self.event_cases.iter().flat_map(|(event_type, payloads)| {
            payloads
                .iter()
                .map(move |payload| Event::with_payload(event_type.clone(), payload.clone()))
        });

        let mut seen = HashSet::new();
        self.events
            .iter()
            .cloned()
            .chain(dynamic)
            .chain(cases)
            .filter_map(|event| {
                let fingerprint = self.event_fingerprint(&event);
                seen.insert(fingerprint.clone()).then_some((fingerprint, event))
            })
            .collect()
    }
}

impl<C: Context> Default for SearchOptions<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Context> Clone for SearchOptions<C> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            events_with: self.events_with.clone(),
            event_cases: self.event_cases.clone(),
            serialize_state: self.serialize_state.clone(),
            serialize_event: self.serialize_event.clone(),
            limit: self.limit,
        }
    }
}

impl<C: Context> fmt::Debug for SearchOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("events", &self.events)
            .field("events_with", &self.events_with.is_some())
            .field("event_cases", &self.event_cases)
            .field("limit", &self.limit)
            .finish()
    }
}
