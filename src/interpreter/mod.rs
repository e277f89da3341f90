//! The imperative shell around a [`Machine`].
//!
//! The engine computes macrosteps as pure values; the interpreter owns the
//! current [`State`], the event queue, the pending timers and the running
//! actors, and carries out the commands each macrostep returns.
//!
//! # Processing model
//!
//! - One macrostep at a time. Events sent while running are appended to a
//!   FIFO queue which is drained before `send` returns.
//! - Events posted by actors join the same queue in arrival order, on the
//!   next `send`, [`advance_time`](Interpreter::advance_time) or
//!   [`flush`](Interpreter::flush). Events from actors that have since
//!   been stopped are dropped.
//! - A failing macrostep publishes nothing; the error is returned and the
//!   previous state stays current.

mod actor;
mod error;
mod timers;

pub use actor::{Actor, ActorRef};
pub use error::InterpreterError;

use crate::core::{Context, Event, Journal, State, StepRecord};
use crate::engine::{Command, ExecutionMode, Machine, Macrostep};
use actor::Mailbox;
use chrono::Utc;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use timers::Timers;
use uuid::Uuid;

/// Lifecycle of an interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    NotStarted,
    Running,
    /// Terminal.
    Stopped,
}

/// Handle returned by [`Interpreter::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<C> = Box<dyn FnMut(&State<C>) + Send>;

/// A queued event, with the id of the actor that posted it if any.
struct Queued {
    event: Event,
    sender: Option<String>,
}

impl Queued {
    fn external(event: Event) -> Self {
        Self {
            event,
            sender: None,
        }
    }

    fn from_actor(event: Event) -> Self {
        let sender = event.origin().map(str::to_string);
        Self { event, sender }
    }
}

/// An actor started by the interpreter, with the handle it was given.
struct Running {
    handle: ActorRef,
    actor: Box<dyn Actor>,
}

impl Running {
    fn stop(mut self) {
        self.handle.close();
        self.actor.stop();
    }
}

/// Runs a machine: one current state, one queue, one processing path.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{MachineBuilder, StateConfig};
/// use statecraft::interpreter::{Interpreter, Status};
/// use std::time::Duration;
///
/// let config = StateConfig::new("light")
///     .initial("green")
///     .state(StateConfig::new("green").after(1000, "yellow"))
///     .state(StateConfig::new("yellow").on("TIMER", "red"))
///     .state(StateConfig::new("red"));
///
/// let machine = MachineBuilder::<()>::new(config).build().unwrap();
/// let mut interpreter = Interpreter::new(machine);
/// interpreter.start().unwrap();
///
/// interpreter.advance_time(Duration::from_millis(1000)).unwrap();
/// assert!(interpreter.state().unwrap().matches("yellow"));
///
/// interpreter.send("TIMER").unwrap();
/// assert!(interpreter.state().unwrap().matches("red"));
///
/// interpreter.stop().unwrap();
/// assert_eq!(interpreter.status(), Status::Stopped);
/// ```
pub struct Interpreter<C: Context> {
    machine: Machine<C>,
    session_id: Uuid,
    status: Status,
    state: Option<State<C>>,
    queue: VecDeque<Queued>,
    mailbox: Mailbox,
    timers: Timers,
    actors: Vec<Running>,
    listeners: Vec<(SubscriptionId, Listener<C>)>,
    next_subscription: u64,
    journal: Journal,
}

impl<C: Context> Interpreter<C> {
    pub fn new(machine: Machine<C>) -> Self {
        Self {
            machine,
            session_id: Uuid::new_v4(),
            status: Status::NotStarted,
            state: None,
            queue: VecDeque::new(),
            mailbox: Mailbox::default(),
            timers: Timers::default(),
            actors: Vec::new(),
            listeners: Vec::new(),
            next_subscription: 0,
            journal: Journal::new(),
        }
    }

    /// Keep at most `limit` macrosteps in the journal, dropping the oldest.
    /// Steps already recorded are discarded.
    pub fn journal_limit(mut self, limit: usize) -> Self {
        self.journal = Journal::with_limit(limit);
        self
    }

    pub fn machine(&self) -> &Machine<C> {
        &self.machine
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The last published state, `None` before `start`.
    pub fn state(&self) -> Option<&State<C>> {
        self.state.as_ref()
    }

    /// Every macrostep that changed the state, oldest first.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Current reading of the virtual clock.
    pub fn clock(&self) -> Duration {
        self.timers.now()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Ids of the running actors, in start order.
    pub fn actors(&self) -> Vec<&str> {
        self.actors.iter().map(|running| running.handle.id()).collect()
    }

    /// Enter the initial configuration, publish it, then process any events
    /// sent before starting.
    ///
    /// Starting a running interpreter is a no-op.
    pub fn start(&mut self) -> Result<&State<C>, InterpreterError> {
        match self.status {
            Status::Stopped => return Err(self.stopped()),
            Status::Running => return self.current(),
            Status::NotStarted => {}
        }

        let step = self.machine.start_step(ExecutionMode::Live).map_err(|error| {
            tracing::warn!(session = %self.session_id, error = %error, "Failed to start interpreter");
            error
        })?;
        self.status = Status::Running;
        tracing::info!(
            session = %self.session_id,
            machine = self.machine.id(),
            "Interpreter started"
        );
        self.apply(step);
        self.drain()?;
        self.current()
    }

    /// Queue an event and, when running, process the queue.
    ///
    /// Events sent before `start` wait for it; events sent after `stop`
    /// are ignored.
    pub fn send(&mut self, event: impl Into<Event>) -> Result<(), InterpreterError> {
        let event = event.into();
        match self.status {
            Status::Stopped => {
                tracing::debug!(session = %self.session_id, event = %event, "Ignoring event sent to stopped interpreter");
                Ok(())
            }
            Status::NotStarted => {
                self.queue.push_back(Queued::external(event));
                Ok(())
            }
            Status::Running => {
                self.queue.push_back(Queued::external(event));
                self.drain()
            }
        }
    }

    /// Process events posted by actors since the last call.
    pub fn flush(&mut self) -> Result<(), InterpreterError> {
        if self.status != Status::Running {
            return Ok(());
        }
        self.drain()
    }

    /// Move the virtual clock forward, firing every timer that falls due in
    /// order. Each fired timer is processed as its own macrostep.
    pub fn advance_time(&mut self, by: Duration) -> Result<(), InterpreterError> {
        if self.status != Status::Running {
            return Ok(());
        }
        self.drain()?;

        let until = self.timers.now() + by;
        while self.status == Status::Running {
            let Some(event) = self.timers.pop_due(until) else {
                break;
            };
            self.queue.push_back(Queued::external(event));
            self.drain()?;
        }
        self.timers.advance_to(until);
        Ok(())
    }

    /// Register a listener called with every state published from now on.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&State<C>) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Run exit actions for every active state, cancel all timers and stop
    /// all actors. Stopping twice is a no-op.
    ///
    /// Teardown happens even if an exit action fails; the failure is
    /// returned afterwards.
    pub fn stop(&mut self) -> Result<(), InterpreterError> {
        match self.status {
            Status::Stopped => return Ok(()),
            Status::NotStarted => {
                self.status = Status::Stopped;
                self.queue.clear();
                return Ok(());
            }
            Status::Running => {}
        }

        let exited = match &self.state {
            Some(state) => self.machine.exit_step(state, ExecutionMode::Live).map(|_| ()),
            None => Ok(()),
        };
        self.teardown();
        tracing::info!(session = %self.session_id, "Interpreter stopped");
        exited.map_err(|error| {
            tracing::warn!(session = %self.session_id, error = %error, "Exit action failed during stop");
            InterpreterError::from(error)
        })
    }

    fn current(&self) -> Result<&State<C>, InterpreterError> {
        self.state.as_ref().ok_or_else(|| self.stopped())
    }

    fn stopped(&self) -> InterpreterError {
        InterpreterError::Stopped {
            session: self.session_id.to_string(),
        }
    }

    /// Process queued events one macrostep at a time until the queue and
    /// the mailbox are both empty.
    fn drain(&mut self) -> Result<(), InterpreterError> {
        loop {
            for event in self.mailbox.drain() {
                self.queue.push_back(Queued::from_actor(event));
            }
            if self.status != Status::Running {
                return Ok(());
            }
            let Some(Queued { event, sender }) = self.queue.pop_front() else {
                return Ok(());
            };
            if let Some(sender) = sender {
                if !self.is_running(&sender) {
                    tracing::debug!(session = %self.session_id, actor = %sender, event = %event, "Dropping event from stopped actor");
                    continue;
                }
            }
            let Some(state) = &self.state else {
                return Ok(());
            };

            tracing::debug!(session = %self.session_id, event = %event, "Processing event");
            let step = self
                .machine
                .step(state, event, ExecutionMode::Live)
                .map_err(|error| {
                    tracing::warn!(session = %self.session_id, error = %error, "Macrostep failed");
                    error
                })?;
            self.apply(step);
        }
    }

    fn is_running(&self, actor: &str) -> bool {
        self.actors.iter().any(|running| running.handle.id() == actor)
    }

    /// Carry out a macrostep's commands and publish its state.
    fn apply(&mut self, step: Macrostep<C>) {
        let Macrostep {
            state,
            commands,
            microsteps,
        } = step;

        for command in commands {
            self.execute(command, state.context());
        }

        if state.changed() {
            let from = self
                .state
                .as_ref()
                .map(|previous| previous.value().clone())
                .unwrap_or_else(|| state.value().clone());
            self.journal.push(StepRecord {
                event: state.event().event_type().to_string(),
                from,
                to: state.value().clone(),
                timestamp: Utc::now(),
                microsteps,
            });
        }

        for (_, listener) in &mut self.listeners {
            listener(&state);
        }
        let done = state.done();
        self.state = Some(state);

        if done {
            tracing::info!(session = %self.session_id, "Machine reached a final state");
            self.teardown();
        }
    }

    fn execute(&mut self, command: Command, context: &C) {
        match command {
            Command::Schedule {
                owner,
                event,
                delay,
            } => {
                tracing::trace!(session = %self.session_id, event = %event, delay_ms = delay.as_millis() as u64, "Scheduling timer");
                self.timers.schedule(owner, event, delay);
            }
            Command::CancelTimers { owner } => {
                self.timers.cancel(owner);
            }
            Command::Invoke { id, src, .. } => {
                let Some(factory) = self.machine.implementations().actor(&src) else {
                    tracing::warn!(session = %self.session_id, actor = %id, src = %src, "No actor registered for source");
                    return;
                };
                let mut actor = factory(context);
                let handle = ActorRef::new(id.clone(), self.mailbox.clone());
                actor.start(handle.clone());
                tracing::debug!(session = %self.session_id, actor = %id, src = %src, "Actor started");
                self.actors.push(Running { handle, actor });
            }
            Command::StopActor { id } => {
                if let Some(index) = self.actors.iter().position(|running| running.handle.id() == id) {
                    self.actors.remove(index).stop();
                    tracing::debug!(session = %self.session_id, actor = %id, "Actor stopped");
                }
            }
            Command::SendTo { actor, event } => {
                match self.actors.iter_mut().find(|running| running.handle.id() == actor) {
                    Some(target) => target.actor.receive(event),
                    None => {
                        tracing::warn!(session = %self.session_id, actor = %actor, event = %event, "Dropping event for unknown actor")
                    }
                }
            }
        }
    }

    /// Cancel every timer and stop every actor, last started first.
    fn teardown(&mut self) {
        let cancelled = self.timers.clear();
        while let Some(running) = self.actors.pop() {
            let id = running.handle.id().to_string();
            running.stop();
            tracing::debug!(session = %self.session_id, actor = %id, "Actor stopped");
        }
        self.queue.clear();
        self.status = Status::Stopped;
        tracing::debug!(session = %self.session_id, cancelled_timers = cancelled, "Interpreter torn down");
    }
}

impl<C: Context> fmt::Debug for Interpreter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("session_id", &self.session_id)
            .field("status", &self.status)
            .field("state", &self.state.as_ref().map(|s| s.value().to_string()))
            .field("queued", &self.queue.len())
            .field("timers", &self.timers.len())
            .field("actors", &self.actors())
            .finish()
    }
}

impl<C: Context> Drop for Interpreter<C> {
    fn drop(&mut self) {
        if self.status == Status::Running {
            self.teardown();
        }
    }
}
