//! Invoked actors.
//!
//! An actor is started when the state invoking it is entered and stopped
//! when that state is exited. It talks back to its parent only by posting
//! events through an [`ActorRef`]; those events land in the parent's
//! mailbox and are processed in arrival order. Once the actor is stopped
//! its handles are closed and anything they post is dropped.

use crate::core::Event;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A child process supervised by an interpreter.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
/// use statecraft::interpreter::{Actor, ActorRef};
///
/// struct Pinger {
///     parent: Option<ActorRef>,
/// }
///
/// impl Actor for Pinger {
///     fn start(&mut self, parent: ActorRef) {
///         parent.send("PING");
///         self.parent = Some(parent);
///     }
///
///     fn receive(&mut self, event: Event) {
///         if let Some(parent) = &self.parent {
///             parent.send(Event::new("ECHO").with("of", event.event_type()));
///         }
///     }
///
///     fn stop(&mut self) {
///         self.parent = None;
///     }
/// }
/// ```
pub trait Actor: Send {
    /// Called once, right after the invoking state is entered.
    fn start(&mut self, parent: ActorRef);

    /// Called for every event the machine sends to this actor.
    fn receive(&mut self, _event: Event) {}

    /// Called once, when the invoking state is exited or the interpreter
    /// stops.
    fn stop(&mut self);
}

/// Shared queue of events posted by actors.
#[derive(Clone, Debug, Default)]
pub(crate) struct Mailbox {
    events: Arc<Mutex<VecDeque<Event>>>,
}

impl Mailbox {
    pub(crate) fn push(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }

    pub(crate) fn drain(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

/// Handle an actor uses to post events to its parent interpreter.
///
/// Cheap to clone and safe to move to other threads or tasks. Events are
/// tagged with the actor's id as their origin. Every clone shares one
/// liveness flag, cleared when the interpreter stops the actor.
#[derive(Clone, Debug)]
pub struct ActorRef {
    id: String,
    mailbox: Mailbox,
    alive: Arc<AtomicBool>,
}

impl ActorRef {
    pub(crate) fn new(id: impl Into<String>, mailbox: Mailbox) -> Self {
        Self {
            id: id.into(),
            mailbox,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Id of the invocation this handle belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// False once the actor has been stopped.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Post an event to the parent. Does nothing after the actor stopped.
    pub fn send(&self, event: impl Into<Event>) {
        if !self.is_alive() {
            let event = event.into();
            tracing::trace!(actor = %self.id, event = %event, "Dropping event from stopped actor");
            return;
        }
        self.mailbox.push(event.into().from_origin(self.id.clone()));
    }

    pub(crate) fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sent_events_are_tagged_with_origin() {
        let mailbox = Mailbox::default();
        let actor = ActorRef::new("fetcher", mailbox.clone());

        actor.send("LOADED");
        actor.send(Event::new("PROGRESS").with("percent", 50));

        let events = mailbox.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "LOADED");
        assert!(events.iter().all(|e| e.origin() == Some("fetcher")));
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn handles_share_one_mailbox() {
        let mailbox = Mailbox::default();
        let first = ActorRef::new("a", mailbox.clone());
        let second = ActorRef::new("b", mailbox.clone());

        first.send("ONE");
        second.send("TWO");
        first.clone().send("THREE");

        let origins: Vec<_> = mailbox
            .drain()
            .into_iter()
            .map(|e| e.origin().map(str::to_string))
            .collect();
        assert_eq!(
            origins,
            vec![Some("a".to_string()), Some("b".to_string()), Some("a".to_string())]
        );
    }

    #[test]
    fn closed_handles_post_nothing() {
        let mailbox = Mailbox::default();
        let actor = ActorRef::new("worker", mailbox.clone());
        let kept = actor.clone();

        actor.close();
        kept.send("LATE");

        assert!(!kept.is_alive());
        assert!(mailbox.drain().is_empty());
    }
}
