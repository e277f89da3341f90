//! Macrosteps: one triggering event plus its eventless and raised closure.

use super::error::ExecutionError;
use super::microstep::Execution;
use super::registry::Implementations;
use super::select::{select_transitions, Trigger};
use super::{Command, ExecutionMode};
use crate::core::{Context, Event, NodeId, State, StateTree, StateValue, TransitionId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

/// Default ceiling on microsteps within one macrostep.
pub const DEFAULT_MAX_MICROSTEPS: usize = 1000;

/// The result of a macrostep: the new snapshot and the commands it
/// requested.
#[derive(Clone, Debug)]
pub struct Macrostep<C: Context> {
    pub state: State<C>,
    pub commands: Vec<Command>,
    pub microsteps: usize,
}

/// A built machine: the state tree, its implementations and the initial
/// context.
///
/// Cloning is cheap for the tree, which is shared.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{MachineBuilder, StateConfig};
///
/// let config = StateConfig::new("toggle")
///     .initial("inactive")
///     .state(StateConfig::new("inactive").on("TOGGLE", "active"))
///     .state(StateConfig::new("active").on("TOGGLE", "inactive"));
///
/// let machine = MachineBuilder::<()>::new(config).build().unwrap();
/// let state = machine.initial_state().unwrap();
/// assert!(state.matches("inactive"));
///
/// let state = machine.transition(&state, "TOGGLE").unwrap();
/// assert!(state.matches("active"));
/// ```
#[derive(Clone, Debug)]
pub struct Machine<C: Context> {
    tree: Arc<StateTree>,
    implementations: Implementations<C>,
    context: C,
    max_microsteps: usize,
}

/// Everything a stabilization pass depends on. Seeing the same key twice
/// means the pass would repeat forever.
#[derive(PartialEq)]
struct CycleKey<C> {
    transitions: Vec<TransitionId>,
    configuration: BTreeSet<NodeId>,
    context: C,
    history: BTreeMap<String, Vec<NodeId>>,
    internal: VecDeque<Event>,
}

impl<C: Context> Machine<C> {
    pub(crate) fn new(
        tree: StateTree,
        implementations: Implementations<C>,
        context: C,
        max_microsteps: usize,
    ) -> Self {
        Self {
            tree: Arc::new(tree),
            implementations,
            context,
            max_microsteps,
        }
    }

    /// Id of the root state.
    pub fn id(&self) -> &str {
        self.tree.root().id()
    }

    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    pub fn implementations(&self) -> &Implementations<C> {
        &self.implementations
    }

    pub fn initial_context(&self) -> &C {
        &self.context
    }

    pub fn max_microsteps(&self) -> usize {
        self.max_microsteps
    }

    /// The same machine starting from a different context.
    pub fn with_context(mut self, context: C) -> Self {
        self.context = context;
        self
    }

    /// Ids of every state, in document order.
    pub fn state_ids(&self) -> Vec<&str> {
        self.tree.nodes().map(|node| node.id()).collect()
    }

    /// The initial state, computed without running effect actions.
    pub fn initial_state(&self) -> Result<State<C>, ExecutionError> {
        self.start_step(ExecutionMode::Replay)
            .map(|step| step.state)
    }

    /// The state following `state` on `event`, computed without running
    /// effect actions.
    pub fn transition(
        &self,
        state: &State<C>,
        event: impl Into<Event>,
    ) -> Result<State<C>, ExecutionError> {
        self.step(state, event.into(), ExecutionMode::Replay)
            .map(|step| step.state)
    }

    /// Enter the initial configuration and stabilize.
    pub fn start_step(&self, mode: ExecutionMode) -> Result<Macrostep<C>, ExecutionError> {
        let event = Event::init();
        let mut execution = self.execution(
            BTreeSet::new(),
            self.context.clone(),
            BTreeMap::new(),
            mode,
        );
        execution.enter_initial(&event)?;
        self.stabilize(&mut execution, &event)?;
        Ok(self.finish(execution, event, None))
    }

    /// Process one event to completion.
    ///
    /// An event that selects no transition (or any event once the machine
    /// is done) leaves configuration and context untouched and yields a
    /// snapshot with `changed == false`.
    pub fn step(
        &self,
        state: &State<C>,
        event: Event,
        mode: ExecutionMode,
    ) -> Result<Macrostep<C>, ExecutionError> {
        if state.done {
            return Ok(self.unchanged(state, event));
        }

        let transitions = select_transitions(
            &self.tree,
            &self.implementations,
            &state.configuration,
            &state.context,
            &event,
            Trigger::Event,
        )?;
        if transitions.is_empty() {
            tracing::trace!(event = %event, state = %state.value, "Event not handled");
            return Ok(self.unchanged(state, event));
        }

        let mut execution = self.execution(
            state.configuration.clone(),
            state.context.clone(),
            state.history.clone(),
            mode,
        );
        execution.microstep(&transitions, &event)?;
        self.stabilize(&mut execution, &event)?;
        Ok(self.finish(execution, event, Some(state)))
    }

    /// Exit every active state, deepest first.
    ///
    /// The returned commands cancel every timer and stop every actor owned
    /// by the configuration.
    pub fn exit_step(
        &self,
        state: &State<C>,
        mode: ExecutionMode,
    ) -> Result<Macrostep<C>, ExecutionError> {
        let event = Event::stop();
        let mut execution = self.execution(
            state.configuration.clone(),
            state.context.clone(),
            state.history.clone(),
            mode,
        );
        execution.exit_all(&event)?;

        let state = State {
            value: StateValue::from_configuration(
                &self.tree,
                self.tree.root_id(),
                &execution.configuration,
            ),
            configuration: execution.configuration,
            context: execution.context,
            history: execution.history,
            event,
            actions: execution.actions,
            done: state.done,
            changed: true,
        };
        Ok(Macrostep {
            state,
            commands: execution.commands,
            microsteps: execution.microsteps,
        })
    }

    fn execution(
        &self,
        configuration: BTreeSet<NodeId>,
        context: C,
        history: BTreeMap<String, Vec<NodeId>>,
        mode: ExecutionMode,
    ) -> Execution<'_, C> {
        Execution {
            tree: &self.tree,
            implementations: &self.implementations,
            mode,
            configuration,
            context,
            history,
            actions: Vec::new(),
            internal: VecDeque::new(),
            commands: Vec::new(),
            microsteps: 0,
        }
    }

    /// Take eventless transitions until none are enabled, then the next
    /// raised event, until both are exhausted or the machine is done.
    fn stabilize(
        &self,
        execution: &mut Execution<'_, C>,
        trigger: &Event,
    ) -> Result<(), ExecutionError> {
        let root = self.tree.root_id();
        let mut current = trigger.clone();
        let mut seen: Vec<CycleKey<C>> = Vec::new();

        loop {
            if self.tree.is_in_final_state(root, &execution.configuration) {
                break;
            }

            let eventless = select_transitions(
                &self.tree,
                &self.implementations,
                &execution.configuration,
                &execution.context,
                &current,
                Trigger::Eventless,
            )?;
            let transitions = if !eventless.is_empty() {
                eventless
            } else if let Some(raised) = execution.internal.pop_front() {
                current = raised;
                let selected = select_transitions(
                    &self.tree,
                    &self.implementations,
                    &execution.configuration,
                    &execution.context,
                    &current,
                    Trigger::Event,
                )?;
                if selected.is_empty() {
                    continue;
                }
                selected
            } else {
                break;
            };

            let key = CycleKey {
                transitions,
                configuration: execution.configuration.clone(),
                context: execution.context.clone(),
                history: execution.history.clone(),
                internal: execution.internal.clone(),
            };
            if seen.contains(&key) {
                let error = ExecutionError::Cycle {
                    state: StateValue::from_configuration(
                        &self.tree,
                        root,
                        &execution.configuration,
                    )
                    .to_string(),
                    event: trigger.event_type().to_string(),
                    transitions: key
                        .transitions
                        .iter()
                        .map(|t| self.describe(*t))
                        .collect(),
                };
                tracing::warn!(error = %error, "Aborting macrostep");
                return Err(error);
            }
            if execution.microsteps >= self.max_microsteps {
                let error = ExecutionError::MicrostepLimit {
                    event: trigger.event_type().to_string(),
                    limit: self.max_microsteps,
                };
                tracing::warn!(error = %error, "Aborting macrostep");
                return Err(error);
            }

            execution.microstep(&key.transitions, &current)?;
            seen.push(key);
        }
        Ok(())
    }

    fn describe(&self, transition: TransitionId) -> String {
        let transition = self.tree.transition(transition);
        let source = self.tree.node(transition.source()).id();
        if transition.is_targetless() {
            return format!("{source} (targetless)");
        }
        let targets: Vec<&str> = transition
            .targets()
            .iter()
            .map(|target| self.tree.node(*target).id())
            .collect();
        format!("{source} -> {}", targets.join(", "))
    }

    fn finish(
        &self,
        execution: Execution<'_, C>,
        event: Event,
        previous: Option<&State<C>>,
    ) -> Macrostep<C> {
        let root = self.tree.root_id();
        let changed = previous.map_or(true, |previous| {
            previous.configuration != execution.configuration
                || previous.context != execution.context
                || !execution.actions.is_empty()
        });
        let state = State {
            value: StateValue::from_configuration(&self.tree, root, &execution.configuration),
            done: self.tree.is_in_final_state(root, &execution.configuration),
            configuration: execution.configuration,
            context: execution.context,
            history: execution.history,
            event,
            actions: execution.actions,
            changed,
        };

        tracing::debug!(
            event = %state.event,
            from = %previous.map(|p| p.value.to_string()).unwrap_or_default(),
            to = %state.value,
            microsteps = execution.microsteps,
            commands = execution.commands.len(),
            "Macrostep"
        );

        Macrostep {
            state,
            commands: execution.commands,
            microsteps: execution.microsteps,
        }
    }

    fn unchanged(&self, state: &State<C>, event: Event) -> Macrostep<C> {
        let mut next = state.clone();
        next.event = event;
        next.actions = Vec::new();
        next.changed = false;
        Macrostep {
            state: next,
            commands: Vec::new(),
            microsteps: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ActionConfig, MachineBuilder, StateConfig, TransitionConfig};
    use crate::core::{Action, Guard};
    use std::sync::Mutex;

    fn build(config: StateConfig) -> Machine<i64> {
        MachineBuilder::new(config)
            .context(0)
            .action("inc", Action::assign(|n: &i64, _: &Event| n + 1))
            .guard("below_three", Guard::context(|n: &i64| *n < 3))
            .build()
            .unwrap()
    }

    #[test]
    fn initial_state_resolves_nested_initials() {
        let config = StateConfig::new("light")
            .initial("red")
            .state(
                StateConfig::new("red")
                    .initial("walk")
                    .state(StateConfig::new("walk"))
                    .state(StateConfig::new("wait")),
            )
            .state(StateConfig::new("green"));
        let machine = build(config);

        let state = machine.initial_state().unwrap();
        assert!(state.matches("red.walk"));
        assert_eq!(state.event().event_type(), crate::core::INIT_EVENT);
        assert!(state.changed());
        assert!(!state.done());
    }

    #[test]
    fn exit_actions_precede_transition_and_entry_actions() {
        let config = StateConfig::new("m")
            .initial("a")
            .state(
                StateConfig::new("a")
                    .initial("a1")
                    .exit("exit_a")
                    .state(StateConfig::new("a1").exit("exit_a1"))
                    .on_transition("GO", TransitionConfig::to("b").action("during")),
            )
            .state(
                StateConfig::new("b")
                    .initial("b1")
                    .entry("enter_b")
                    .state(StateConfig::new("b1").entry("enter_b1")),
            );

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = MachineBuilder::<()>::new(config);
        for name in ["exit_a", "exit_a1", "during", "enter_b", "enter_b1"] {
            let log = log.clone();
            builder = builder.action(
                name,
                Action::effect(move |_: &(), _: &Event| {
                    log.lock().unwrap().push(name);
                }),
            );
        }
        let machine = builder.build().unwrap();

        let state = machine.initial_state().unwrap();
        let step = machine
            .step(&state, Event::new("GO"), ExecutionMode::Live)
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["exit_a1", "exit_a", "during", "enter_b", "enter_b1"]
        );
        assert_eq!(step.state.actions(), ["exit_a1", "exit_a", "during", "enter_b", "enter_b1"]);
        assert!(step.state.matches("b.b1"));
    }

    #[test]
    fn replay_mode_skips_effects_but_keeps_assignments() {
        let config = StateConfig::new("m")
            .initial("a")
            .state(StateConfig::new("a").on_transition(
                "GO",
                TransitionConfig::to("b").action("inc").action("shout"),
            ))
            .state(StateConfig::new("b"));

        let log = Arc::new(Mutex::new(0));
        let counter = log.clone();
        let machine = MachineBuilder::new(config)
            .context(0i64)
            .action("inc", Action::assign(|n: &i64, _: &Event| n + 1))
            .action(
                "shout",
                Action::effect(move |_: &i64, _: &Event| *counter.lock().unwrap() += 1),
            )
            .build()
            .unwrap();

        let state = machine.initial_state().unwrap();
        let next = machine.transition(&state, "GO").unwrap();
        assert_eq!(*next.context(), 1);
        assert_eq!(*log.lock().unwrap(), 0);

        machine
            .step(&state, Event::new("GO"), ExecutionMode::Live)
            .unwrap();
        assert_eq!(*log.lock().unwrap(), 1);
    }

    #[test]
    fn unhandled_event_is_a_no_op() {
        let config = StateConfig::new("m")
            .initial("a")
            .state(StateConfig::new("a").on("GO", "b"))
            .state(StateConfig::new("b"));
        let machine = build(config);

        let state = machine.initial_state().unwrap();
        let next = machine.transition(&state, "UNKNOWN").unwrap();
        assert!(!next.changed());
        assert_eq!(next.configuration(), state.configuration());
        assert_eq!(next.context(), state.context());
        assert_eq!(next.event().event_type(), "UNKNOWN");
        assert!(next.actions().is_empty());
    }

    #[test]
    fn eventless_transitions_run_until_guard_fails() {
        let config = StateConfig::new("m")
            .initial("counting")
            .state(
                StateConfig::new("counting")
                    .always(TransitionConfig::targetless().guard("below_three").action("inc")),
            );
        let machine = build(config);

        let state = machine.initial_state().unwrap();
        assert_eq!(*state.context(), 3);
    }

    #[test]
    fn raised_events_are_processed_within_the_macrostep() {
        let config = StateConfig::new("m")
            .initial("a")
            .state(StateConfig::new("a").on_transition(
                "GO",
                TransitionConfig::to("b").action(ActionConfig::raise(Event::new("NEXT"))),
            ))
            .state(StateConfig::new("b").on("NEXT", "c"))
            .state(StateConfig::new("c"));
        let machine = build(config);

        let state = machine.initial_state().unwrap();
        let step = machine
            .step(&state, Event::new("GO"), ExecutionMode::Replay)
            .unwrap();
        assert!(step.state.matches("c"));
        assert_eq!(step.microsteps, 2);
        assert_eq!(step.state.event().event_type(), "GO");
    }

    #[test]
    fn eventless_cycle_is_detected() {
        let config = StateConfig::new("m")
            .initial("a")
            .state(StateConfig::new("a").on("GO", "b"))
            .state(StateConfig::new("b").always("c"))
            .state(StateConfig::new("c").always("b"));
        let machine = build(config);

        let state = machine.initial_state().unwrap();
        let err = machine.transition(&state, "GO").unwrap_err();
        assert!(matches!(err, ExecutionError::Cycle { .. }));
        assert!(err.is_definition_defect());
    }

    #[test]
    fn growing_context_hits_the_microstep_limit() {
        let config = StateConfig::new("m")
            .initial("a")
            .state(StateConfig::new("a").always(TransitionConfig::targetless().action("inc")));

        let machine = MachineBuilder::new(config)
            .context(0i64)
            .action("inc", Action::assign(|n: &i64, _: &Event| n + 1))
            .max_microsteps(50)
            .build()
            .unwrap();

        let err = machine.initial_state().unwrap_err();
        assert_eq!(
            err,
            ExecutionError::MicrostepLimit {
                event: crate::core::INIT_EVENT.to_string(),
                limit: 50
            }
        );
    }

    #[test]
    fn final_child_raises_done_event() {
        let config = StateConfig::new("m")
            .initial("task")
            .state(
                StateConfig::new("task")
                    .initial("working")
                    .on_done("finished")
                    .state(StateConfig::new("working").on("COMPLETE", "complete"))
                    .state(StateConfig::new("complete").final_state()),
            )
            .state(StateConfig::new("finished").final_state());
        let machine = build(config);

        let state = machine.initial_state().unwrap();
        let state = machine.transition(&state, "COMPLETE").unwrap();
        assert!(state.matches("finished"));
        assert!(state.done());

        let after = machine.transition(&state, "COMPLETE").unwrap();
        assert!(!after.changed());
    }

    #[test]
    fn delayed_transitions_are_returned_as_commands() {
        let config = StateConfig::new("m")
            .initial("a")
            .state(StateConfig::new("a").after(500, "b").on("SKIP", "b"))
            .state(StateConfig::new("b"));
        let machine = build(config);

        let start = machine.start_step(ExecutionMode::Live).unwrap();
        assert!(matches!(
            start.commands.as_slice(),
            [Command::Schedule { delay, .. }] if delay.as_millis() == 500
        ));

        let skip = machine
            .step(&start.state, Event::new("SKIP"), ExecutionMode::Live)
            .unwrap();
        assert!(matches!(
            skip.commands.as_slice(),
            [Command::CancelTimers { .. }]
        ));
    }

    #[test]
    fn exit_step_leaves_an_empty_configuration() {
        let config = StateConfig::new("m")
            .initial("a")
            .state(StateConfig::new("a").initial("a1").state(StateConfig::new("a1")));
        let machine = build(config);

        let state = machine.initial_state().unwrap();
        let stopped = machine.exit_step(&state, ExecutionMode::Replay).unwrap();
        assert!(stopped.state.configuration().is_empty());
        assert_eq!(stopped.state.event().event_type(), crate::core::STOP_EVENT);
    }
}
