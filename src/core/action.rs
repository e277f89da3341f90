//! Named action implementations.
//!
//! Actions are registered on the machine builder and referenced by name
//! from entry/exit lists and transitions. Two kinds exist:
//!
//! - **Assign**: computes a replacement context from `(context, event)`.
//! - **Effect**: a side effect that observes `(context, event)`. Effects are
//!   skipped when a machine is replayed for plan search.
//!
//! Raising events and messaging invoked actors are built into the
//! definition format (see `builder::ActionConfig`) and need no registration.

use super::context::Context;
use super::event::Event;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a guard or an action implementation.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

type AssignFn<C> = Arc<dyn Fn(&C, &Event) -> Result<C, ActionError> + Send + Sync>;
type EffectFn<C> = Arc<dyn Fn(&C, &Event) -> Result<(), ActionError> + Send + Sync>;

/// An action implementation.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Action, Event};
///
/// #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
/// struct Counter {
///     count: u32,
/// }
///
/// let increment = Action::assign(|ctx: &Counter, _: &Event| Counter { count: ctx.count + 1 });
/// let log = Action::effect(|ctx: &Counter, event: &Event| {
///     println!("{} at {}", event, ctx.count);
/// });
///
/// assert!(increment.is_assign());
/// assert!(!log.is_assign());
/// ```
pub enum Action<C: Context> {
    Assign(AssignFn<C>),
    Effect(EffectFn<C>),
}

impl<C: Context> Action<C> {
    /// Context assignment from an infallible function.
    pub fn assign<F>(f: F) -> Self
    where
        F: Fn(&C, &Event) -> C + Send + Sync + 'static,
    {
        Action::Assign(Arc::new(move |ctx, event| Ok(f(ctx, event))))
    }

    /// Context assignment that may fail.
    pub fn try_assign<F>(f: F) -> Self
    where
        F: Fn(&C, &Event) -> Result<C, ActionError> + Send + Sync + 'static,
    {
        Action::Assign(Arc::new(f))
    }

    /// Side effect from an infallible function.
    pub fn effect<F>(f: F) -> Self
    where
        F: Fn(&C, &Event) + Send + Sync + 'static,
    {
        Action::Effect(Arc::new(move |ctx, event| {
            f(ctx, event);
            Ok(())
        }))
    }

    /// Side effect that may fail.
    pub fn try_effect<F>(f: F) -> Self
    where
        F: Fn(&C, &Event) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Action::Effect(Arc::new(f))
    }

    pub fn is_assign(&self) -> bool {
        matches!(self, Action::Assign(_))
    }
}

impl<C: Context> Clone for Action<C> {
    fn clone(&self) -> Self {
        match self {
            Action::Assign(f) => Action::Assign(Arc::clone(f)),
            Action::Effect(f) => Action::Effect(Arc::clone(f)),
        }
    }
}

impl<C: Context> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Assign(_) => f.write_str("Action::Assign(..)"),
            Action::Effect(_) => f.write_str("Action::Effect(..)"),
        }
    }
}
