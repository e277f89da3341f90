//! Property-based tests for the execution engine.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated event sequences.

use proptest::prelude::*;
use statecraft::builder::{MachineBuilder, StateConfig, TransitionConfig};
use statecraft::core::{Action, Event, Guard, HistoryMode, NodeId, State, StateTree};
use statecraft::engine::Machine;
use statecraft::graph::{shortest_plans, SearchOptions};

const EVENTS: [&str; 9] = [
    "NEXT", "BACK", "TOGGLE", "RESET", "PAUSE", "RESUME", "BUMP", "RUSH", "NOPE",
];

/// A machine mixing compound, parallel and history states with guarded,
/// eventless and cross-region transitions.
fn workshop() -> Machine<i64> {
    let config = StateConfig::new("shop")
        .initial("closed")
        .state(
            StateConfig::new("closed")
                .on("NEXT", "open")
                .on("RESUME", "open.hist"),
        )
        .state(
            StateConfig::new("open")
                .parallel()
                .on("RESET", "closed")
                .on("PAUSE", "closed")
                .state(
                    StateConfig::new("lights")
                        .initial("off")
                        .state(
                            StateConfig::new("off")
                                .on("TOGGLE", "on")
                                .on("RUSH", "#shop.open.line.running"),
                        )
                        .state(StateConfig::new("on").on("TOGGLE", "off")),
                )
                .state(
                    StateConfig::new("line")
                        .initial("idle")
                        .state(StateConfig::new("idle").on("NEXT", "running"))
                        .state(
                            StateConfig::new("running")
                                .initial("slow")
                                .on("BACK", "idle")
                                .state(StateConfig::new("slow").on_transition(
                                    "BUMP",
                                    TransitionConfig::to("fast").action("bump"),
                                ))
                                .state(
                                    StateConfig::new("fast")
                                        .always(TransitionConfig::to("slow").guard("overheated"))
                                        .on_transition(
                                            "BUMP",
                                            TransitionConfig::targetless().action("bump"),
                                        ),
                                ),
                        ),
                )
                .state(StateConfig::new("hist").history(HistoryMode::Deep)),
        );

    MachineBuilder::new(config)
        .context(0i64)
        .action("bump", Action::assign(|n: &i64, _: &Event| (n + 1) % 7))
        .guard("overheated", Guard::context(|n: &i64| *n >= 5))
        .build()
        .unwrap()
}

fn assert_well_formed(tree: &StateTree, state: &State<i64>) -> Result<(), TestCaseError> {
    let configuration = state.configuration();
    prop_assert!(configuration.contains(&tree.root_id()));

    for id in configuration {
        let node = tree.node(*id);
        if let Some(parent) = node.parent() {
            prop_assert!(configuration.contains(&parent), "{} active without parent", node.id());
        }
        prop_assert!(!node.is_history(), "history state {} is active", node.id());

        let children: Vec<NodeId> = node
            .children()
            .iter()
            .copied()
            .filter(|child| !tree.node(*child).is_history())
            .collect();
        let active = children.iter().filter(|c| configuration.contains(*c)).count();
        if node.is_compound() {
            prop_assert_eq!(active, 1, "compound {} must have one active child", node.id());
        }
        if node.is_parallel() {
            prop_assert_eq!(active, children.len(), "parallel {} must have every region active", node.id());
        }
    }
    Ok(())
}

fn replay(machine: &Machine<i64>, events: &[&str]) -> Vec<State<i64>> {
    let mut states = vec![machine.initial_state().unwrap()];
    for event in events {
        let next = machine.transition(states.last().unwrap(), *event).unwrap();
        states.push(next);
    }
    states
}

fn arbitrary_events() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(EVENTS.to_vec()), 0..40)
}

proptest! {
    #[test]
    fn every_state_is_a_legal_configuration(events in arbitrary_events()) {
        let machine = workshop();
        for state in replay(&machine, &events) {
            assert_well_formed(machine.tree(), &state)?;
        }
    }

    #[test]
    fn replay_is_deterministic(events in arbitrary_events()) {
        let machine = workshop();
        let first = replay(&machine, &events);
        let second = replay(&machine, &events);
        prop_assert_eq!(first.last(), second.last());
    }

    #[test]
    fn unhandled_events_change_nothing(events in arbitrary_events()) {
        let machine = workshop();
        for state in replay(&machine, &events) {
            let next = machine.transition(&state, "NOPE").unwrap();
            prop_assert!(!next.changed());
            prop_assert_eq!(next.configuration(), state.configuration());
            prop_assert_eq!(next.context(), state.context());
        }
    }

    #[test]
    fn context_stays_in_range(events in arbitrary_events()) {
        let machine = workshop();
        for state in replay(&machine, &events) {
            prop_assert!((0..7).contains(state.context()));
        }
    }

    #[test]
    fn shortest_plans_replay_to_their_target(take in 1usize..6) {
        let machine = workshop();
        let events: Vec<Event> = EVENTS[..take].iter().map(|e| Event::new(*e)).collect();
        let options = SearchOptions::new().events(events);

        let plans = shortest_plans(&machine, &options).unwrap();
        for plan in &plans {
            let mut state = machine.initial_state().unwrap();
            for event in plan.events() {
                state = machine.transition(&state, event.clone()).unwrap();
            }
            prop_assert_eq!(&state, &plan.state);
        }
    }
}
