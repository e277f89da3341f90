//! Declarative machine definitions.
//!
//! A definition is a tree of [`StateConfig`] values. It is plain data: it
//! can be written with the fluent helpers below or parsed from JSON, and it
//! refers to guards, actions and actors only by name.

use crate::core::{Event, HistoryMode, NodeKind};
use serde::{Deserialize, Serialize};

/// Definition of one state and its subtree.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{StateConfig, TransitionConfig};
///
/// let light = StateConfig::new("light")
///     .initial("green")
///     .state(StateConfig::new("green").on("TIMER", "yellow"))
///     .state(StateConfig::new("yellow").on("TIMER", "red"))
///     .state(
///         StateConfig::new("red")
///             .on("TIMER", "green")
///             .on_transition("POWER_OUTAGE", TransitionConfig::to("red").guard("isOut")),
///     );
///
/// assert_eq!(light.states.len(), 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Inferred when absent: compound if `states` is non-empty, atomic otherwise.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryMode>,

    /// Default targets of a history state with nothing remembered yet.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<StateConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on: Vec<EventConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub always: Vec<TransitionConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<DelayConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_done: Vec<TransitionConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<ActionConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exit: Vec<ActionConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invoke: Vec<InvokeConfig>,
}

/// Candidate transitions for one event type, in declaration order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    pub event: String,
    pub transitions: Vec<TransitionConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Empty for a targetless transition that only runs actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionConfig>,

    /// Exit and re-enter the source even when every target is a descendant.
    #[serde(default)]
    pub reenter: bool,
}

/// Delayed transitions fired `delay_ms` after their state is entered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelayConfig {
    pub delay_ms: u64,
    pub transitions: Vec<TransitionConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvokeConfig {
    /// Defaults to `<state id>:invocation[<n>]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub src: String,
}

/// An action reference inside a definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionConfig {
    /// A registered assign/effect implementation.
    Named(String),
    /// Raise an internal event.
    Raise { raise: Event },
    /// Send an event to an invoked actor.
    SendTo { send_to: String, event: Event },
}

impl ActionConfig {
    pub fn named(name: impl Into<String>) -> Self {
        ActionConfig::Named(name.into())
    }

    pub fn raise(event: impl Into<Event>) -> Self {
        ActionConfig::Raise {
            raise: event.into(),
        }
    }

    pub fn send_to(actor: impl Into<String>, event: impl Into<Event>) -> Self {
        ActionConfig::SendTo {
            send_to: actor.into(),
            event: event.into(),
        }
    }
}

impl From<&str> for ActionConfig {
    fn from(name: &str) -> Self {
        ActionConfig::named(name)
    }
}

impl From<String> for ActionConfig {
    fn from(name: String) -> Self {
        ActionConfig::Named(name)
    }
}

impl TransitionConfig {
    /// Transition to a single target.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: vec![target.into()],
            ..Self::default()
        }
    }

    /// Transition to several targets at once (parallel regions).
    pub fn to_all<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            target: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Transition that runs actions without changing the configuration.
    pub fn targetless() -> Self {
        Self::default()
    }

    pub fn guard(mut self, name: impl Into<String>) -> Self {
        self.guard = Some(name.into());
        self
    }

    pub fn action(mut self, action: impl Into<ActionConfig>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn reenter(mut self, reenter: bool) -> Self {
        self.reenter = reenter;
        self
    }
}

impl From<&str> for TransitionConfig {
    fn from(target: &str) -> Self {
        TransitionConfig::to(target)
    }
}

impl StateConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Explicit id, resolvable as `#id`.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn parallel(self) -> Self {
        self.kind(NodeKind::Parallel)
    }

    pub fn final_state(self) -> Self {
        self.kind(NodeKind::Final)
    }

    /// Mark as a history pseudo-state.
    pub fn history(mut self, mode: HistoryMode) -> Self {
        self.history = Some(mode);
        self.kind(NodeKind::History)
    }

    /// Default target of a history state.
    pub fn history_target(mut self, target: impl Into<String>) -> Self {
        self.target.push(target.into());
        self
    }

    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.initial = Some(key.into());
        self
    }

    pub fn state(mut self, child: StateConfig) -> Self {
        self.states.push(child);
        self
    }

    /// Unguarded transition to `target` on `event`.
    pub fn on(self, event: impl Into<String>, target: impl Into<String>) -> Self {
        self.on_transition(event, TransitionConfig::to(target))
    }

    /// Append a candidate transition for `event`, after any already declared.
    pub fn on_transition(
        mut self,
        event: impl Into<String>,
        transition: impl Into<TransitionConfig>,
    ) -> Self {
        let event = event.into();
        let transition = transition.into();
        match self.on.iter_mut().find(|handler| handler.event == event) {
            Some(handler) => handler.transitions.push(transition),
            None => self.on.push(EventConfig {
                event,
                transitions: vec![transition],
            }),
        }
        self
    }

    pub fn always(mut self, transition: impl Into<TransitionConfig>) -> Self {
        self.always.push(transition.into());
        self
    }

    pub fn after(mut self, delay_ms: u64, transition: impl Into<TransitionConfig>) -> Self {
        let transition = transition.into();
        match self.after.iter_mut().find(|delay| delay.delay_ms == delay_ms) {
            Some(delay) => delay.transitions.push(transition),
            None => self.after.push(DelayConfig {
                delay_ms,
                transitions: vec![transition],
            }),
        }
        self
    }

    /// Transition taken when this state reaches a final configuration.
    pub fn on_done(mut self, transition: impl Into<TransitionConfig>) -> Self {
        self.on_done.push(transition.into());
        self
    }

    pub fn entry(mut self, action: impl Into<ActionConfig>) -> Self {
        self.entry.push(action.into());
        self
    }

    pub fn exit(mut self, action: impl Into<ActionConfig>) -> Self {
        self.exit.push(action.into());
        self
    }

    pub fn invoke(mut self, id: impl Into<String>, src: impl Into<String>) -> Self {
        self.invoke.push(InvokeConfig {
            id: Some(id.into()),
            src: src.into(),
        });
        self
    }

    /// Kind after inference.
    pub fn resolved_kind(&self) -> NodeKind {
        match self.kind {
            Some(kind) => kind,
            None if self.history.is_some() => NodeKind::History,
            None if self.states.is_empty() => NodeKind::Atomic,
            None => NodeKind::Compound,
        }
    }
}
