//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions over the current context and the
//! event being processed. They are registered by name on the machine
//! builder and referenced by name from transition definitions.

use super::action::ActionError;
use super::context::Context;
use super::event::Event;
use std::fmt;
use std::sync::Arc;

type Predicate<C> = Arc<dyn Fn(&C, &Event) -> Result<bool, ActionError> + Send + Sync>;

/// Pure predicate that determines if a transition is enabled.
///
/// Guards are evaluated in declaration order while selecting transitions.
/// They must be deterministic and free of side effects; the engine may
/// evaluate them any number of times (for example during plan search).
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Event, Guard};
///
/// #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
/// struct Light {
///     elapsed: u32,
/// }
///
/// let can_stop = Guard::new(|ctx: &Light, event: &Event| {
///     event.get_i64("duration") == Some(0) && ctx.elapsed > 0
/// });
///
/// let countdown = Event::new("PED_COUNTDOWN").with("duration", 0);
/// assert!(can_stop.check(&Light { elapsed: 1 }, &countdown).unwrap());
/// assert!(!can_stop.check(&Light { elapsed: 0 }, &countdown).unwrap());
/// ```
pub struct Guard<C: Context> {
    predicate: Predicate<C>,
}

impl<C: Context> Guard<C> {
    /// Create a guard from a pure, infallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(move |ctx, event| Ok(predicate(ctx, event))),
        }
    }

    /// Create a guard whose evaluation can fail.
    ///
    /// A failure aborts the macrostep and is reported to the caller of
    /// `send`/`start`.
    pub fn try_new<F>(predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> Result<bool, ActionError> + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Guard that only looks at the context.
    pub fn context<F>(predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self::new(move |ctx, _| predicate(ctx))
    }

    /// Guard that only looks at the event.
    pub fn event<F>(predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self::new(move |_, event| predicate(event))
    }

    /// Evaluate the guard.
    pub fn check(&self, context: &C, event: &Event) -> Result<bool, ActionError> {
        (self.predicate)(context, event)
    }
}

impl<C: Context> Clone for Guard<C> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<C: Context> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    struct Greeting {
        hour: u32,
    }

    #[test]
    fn guard_reads_context() {
        let morning = Guard::context(|ctx: &Greeting| ctx.hour < 12);
        let event = Event::new("DECIDE");

        assert!(morning.check(&Greeting { hour: 10 }, &event).unwrap());
        assert!(!morning.check(&Greeting { hour: 13 }, &event).unwrap());
    }

    #[test]
    fn guard_reads_event_payload() {
        let aloha = Guard::<Greeting>::event(|e| e.get_bool("aloha").unwrap_or(false));
        let ctx = Greeting { hour: 10 };

        assert!(aloha.check(&ctx, &Event::new("DECIDE").with("aloha", true)).unwrap());
        assert!(!aloha.check(&ctx, &Event::new("DECIDE")).unwrap());
    }

    #[test]
    fn guard_is_deterministic() {
        let guard = Guard::context(|ctx: &Greeting| ctx.hour < 18);
        let ctx = Greeting { hour: 15 };
        let event = Event::new("DECIDE");

        assert_eq!(
            guard.check(&ctx, &event).unwrap(),
            guard.check(&ctx, &event).unwrap()
        );
    }

    #[test]
    fn fallible_guard_reports_errors() {
        let guard = Guard::try_new(|_: &Greeting, e: &Event| {
            e.get_i64("duration")
                .map(|d| d == 0)
                .ok_or_else(|| ActionError::new("duration missing"))
        });

        let err = guard
            .check(&Greeting { hour: 1 }, &Event::new("PED_COUNTDOWN"))
            .unwrap_err();
        assert_eq!(err.to_string(), "duration missing");
    }

    #[test]
    fn cloned_guard_shares_predicate() {
        let guard = Guard::context(|ctx: &Greeting| ctx.hour == 22);
        let cloned = guard.clone();
        let event = Event::new("X");

        assert!(cloned.check(&Greeting { hour: 22 }, &event).unwrap());
    }
}
