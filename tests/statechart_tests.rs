//! Behavioural tests for transition selection and microstep execution.

use serde::{Deserialize, Serialize};
use statecraft::builder::{ActionConfig, MachineBuilder, StateConfig, TransitionConfig};
use statecraft::core::{Action, Event, Guard, HistoryMode, State};
use statecraft::engine::{ExecutionError, Machine};

#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
struct Light {
    elapsed: u32,
}

fn traffic_light(elapsed: u32) -> Machine<Light> {
    let config = StateConfig::new("light")
        .initial("green")
        .state(
            StateConfig::new("green")
                .on("TIMER", "yellow")
                .on("POWER_OUTAGE", "red"),
        )
        .state(
            StateConfig::new("yellow")
                .on("TIMER", "red")
                .on("POWER_OUTAGE", "red"),
        )
        .state(
            StateConfig::new("red")
                .initial("walk")
                .on("TIMER", "green")
                .on("POWER_OUTAGE", "red")
                .state(StateConfig::new("walk").on("PED_COUNTDOWN", "wait"))
                .state(StateConfig::new("wait").on_transition(
                    "PED_COUNTDOWN",
                    TransitionConfig::to("stop").guard("countdown_finished"),
                ))
                .state(StateConfig::new("stop")),
        );

    MachineBuilder::with_context(config, Light { elapsed })
        .guard(
            "countdown_finished",
            Guard::new(|ctx: &Light, event: &Event| {
                event.get_i64("duration") == Some(0) && ctx.elapsed > 0
            }),
        )
        .build()
        .unwrap()
}

fn walk_to_wait(machine: &Machine<Light>) -> State<Light> {
    let state = machine.initial_state().unwrap();
    let state = machine.transition(&state, "TIMER").unwrap();
    let state = machine.transition(&state, "TIMER").unwrap();
    assert!(state.matches("red.walk"));
    let state = machine.transition(&state, "PED_COUNTDOWN").unwrap();
    assert!(state.matches("red.wait"));
    state
}

#[test]
fn countdown_with_zero_duration_stops_pedestrians() {
    let machine = traffic_light(1);
    let wait = walk_to_wait(&machine);

    let countdown = Event::new("PED_COUNTDOWN").with("duration", 0);
    let state = machine.transition(&wait, countdown).unwrap();
    assert!(state.matches("red.stop"));
}

#[test]
fn countdown_with_remaining_duration_keeps_waiting() {
    let machine = traffic_light(1);
    let wait = walk_to_wait(&machine);

    let countdown = Event::new("PED_COUNTDOWN").with("duration", 1);
    let state = machine.transition(&wait, countdown).unwrap();
    assert!(state.matches("red.wait"));
    assert!(!state.changed());
}

#[test]
fn countdown_needs_elapsed_time() {
    let machine = traffic_light(0);
    let wait = walk_to_wait(&machine);

    let countdown = Event::new("PED_COUNTDOWN").with("duration", 0);
    let state = machine.transition(&wait, countdown).unwrap();
    assert!(state.matches("red.wait"));
}

#[test]
fn parent_handler_applies_from_any_child() {
    let machine = traffic_light(0);
    let wait = walk_to_wait(&machine);

    let state = machine.transition(&wait, "TIMER").unwrap();
    assert!(state.matches("green"));
}

#[test]
fn parallel_event_only_changes_handling_region() {
    let config = StateConfig::new("p")
        .parallel()
        .state(StateConfig::new("foo"))
        .state(StateConfig::new("bar"))
        .state(
            StateConfig::new("baz")
                .initial("one")
                .state(StateConfig::new("one").on("E", "two"))
                .state(StateConfig::new("two")),
        );
    let machine = MachineBuilder::<()>::new(config).build().unwrap();

    let state = machine.initial_state().unwrap();
    assert_eq!(state.value().to_string(), r#"{"bar":{},"baz":"one","foo":{}}"#);

    let next = machine.transition(&state, "E").unwrap();
    assert_eq!(next.value().to_string(), r#"{"bar":{},"baz":"two","foo":{}}"#);

    let tree = machine.tree();
    for region in ["p.foo", "p.bar"] {
        let node = tree.find(region).unwrap().index();
        assert!(state.is_active(node));
        assert!(next.is_active(node));
    }
}

#[test]
fn transition_across_regions_keeps_every_region_active() {
    let config = StateConfig::new("m").initial("p").state(
        StateConfig::new("p")
            .parallel()
            .state(
                StateConfig::new("a")
                    .initial("a1")
                    .state(StateConfig::new("a1").on("GO", "#m.p.b.b2"))
                    .state(StateConfig::new("a2")),
            )
            .state(
                StateConfig::new("b")
                    .initial("b1")
                    .state(StateConfig::new("b1"))
                    .state(StateConfig::new("b2")),
            ),
    );
    let machine = MachineBuilder::<()>::new(config).build().unwrap();

    let state = machine.initial_state().unwrap();
    assert_eq!(state.value().to_string(), r#"{"p":{"a":"a1","b":"b1"}}"#);

    let next = machine.transition(&state, "GO").unwrap();
    assert_eq!(next.value().to_string(), r#"{"p":{"a":"a1","b":"b2"}}"#);
    assert!(next.matches("p.a.a1"));
    assert!(next.matches("p.b.b2"));
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
struct Greeting {
    hour: u32,
}

fn greeting_machine() -> Machine<Greeting> {
    let config = StateConfig::new("greeting")
        .initial("pending")
        .state(
            StateConfig::new("pending")
                .on_transition(
                    "DECIDE",
                    TransitionConfig::targetless()
                        .guard("aloha")
                        .action(ActionConfig::raise(Event::new("ALOHA"))),
                )
                .on_transition(
                    "DECIDE",
                    TransitionConfig::targetless()
                        .guard("morning")
                        .action(ActionConfig::raise(Event::new("MORNING"))),
                )
                .on_transition(
                    "DECIDE",
                    TransitionConfig::targetless()
                        .guard("afternoon")
                        .action(ActionConfig::raise(Event::new("AFTERNOON"))),
                )
                .on_transition(
                    "DECIDE",
                    TransitionConfig::targetless()
                        .guard("evening")
                        .action(ActionConfig::raise(Event::new("EVENING"))),
                )
                .on_transition(
                    "DECIDE",
                    TransitionConfig::targetless().action(ActionConfig::raise(Event::new("NIGHT"))),
                ),
        )
        .state(StateConfig::new("morning"))
        .state(StateConfig::new("afternoon"))
        .state(StateConfig::new("evening"))
        .state(StateConfig::new("night"))
        .state(StateConfig::new("aloha"))
        .on("MORNING", ".morning")
        .on("AFTERNOON", ".afternoon")
        .on("EVENING", ".evening")
        .on("NIGHT", ".night")
        .on("ALOHA", ".aloha");

    MachineBuilder::with_context(config, Greeting { hour: 10 })
        .guard(
            "aloha",
            Guard::event(|e: &Event| e.get_bool("aloha") == Some(true)),
        )
        .guard("morning", Guard::context(|g: &Greeting| g.hour < 12))
        .guard("afternoon", Guard::context(|g: &Greeting| g.hour < 18))
        .guard("evening", Guard::context(|g: &Greeting| g.hour < 22))
        .build()
        .unwrap()
}

#[test]
fn first_true_guard_in_declaration_order_wins() {
    let machine = greeting_machine();
    let state = machine.initial_state().unwrap();

    let state = machine.transition(&state, "DECIDE").unwrap();
    assert!(state.matches("morning"));
    assert_eq!(state.actions(), ["raise(MORNING)"]);
}

#[test]
fn event_payload_guard_precedes_context_guards() {
    let machine = greeting_machine();
    let state = machine.initial_state().unwrap();

    let state = machine
        .transition(&state, Event::new("DECIDE").with("aloha", true))
        .unwrap();
    assert!(state.matches("aloha"));
}

#[test]
fn later_guards_apply_as_context_changes() {
    let machine = greeting_machine();
    for (hour, expected) in [(15, "afternoon"), (20, "evening"), (23, "night")] {
        let machine = machine.clone().with_context(Greeting { hour });
        let state = machine.initial_state().unwrap();
        let state = machine.transition(&state, "DECIDE").unwrap();
        assert!(state.matches(expected), "hour {hour} should be {expected}");
    }
}

fn noop_actions(builder: MachineBuilder<()>, names: &[&str]) -> MachineBuilder<()> {
    names.iter().fold(builder, |builder, name| {
        builder.action(*name, Action::effect(|_: &(), _: &Event| {}))
    })
}

#[test]
fn exits_complete_before_any_entry() {
    let config = StateConfig::new("m")
        .initial("p")
        .state(
            StateConfig::new("p")
                .parallel()
                .exit("exit_p")
                .on_transition("LEAVE", TransitionConfig::to("q").action("during"))
                .state(
                    StateConfig::new("left")
                        .initial("l1")
                        .exit("exit_left")
                        .state(StateConfig::new("l1").exit("exit_l1")),
                )
                .state(
                    StateConfig::new("right")
                        .initial("r1")
                        .exit("exit_right")
                        .state(StateConfig::new("r1").exit("exit_r1")),
                ),
        )
        .state(
            StateConfig::new("q")
                .initial("q1")
                .entry("enter_q")
                .state(StateConfig::new("q1").entry("enter_q1")),
        );

    let machine = noop_actions(
        MachineBuilder::new(config),
        &[
            "exit_p", "during", "exit_left", "exit_l1", "exit_right", "exit_r1", "enter_q",
            "enter_q1",
        ],
    )
    .build()
    .unwrap();

    let state = machine.initial_state().unwrap();
    let state = machine.transition(&state, "LEAVE").unwrap();
    assert_eq!(
        state.actions(),
        [
            "exit_r1",
            "exit_right",
            "exit_l1",
            "exit_left",
            "exit_p",
            "during",
            "enter_q",
            "enter_q1"
        ]
    );
}

#[test]
fn internal_transition_keeps_source_active() {
    let config = StateConfig::new("m")
        .initial("a")
        .state(
            StateConfig::new("a")
                .initial("a1")
                .entry("enter_a")
                .exit("exit_a")
                .on("INNER", ".a2")
                .on_transition("OUTER", TransitionConfig::to(".a2").reenter(true))
                .state(StateConfig::new("a1").exit("exit_a1"))
                .state(StateConfig::new("a2").entry("enter_a2")),
        );
    let machine = noop_actions(
        MachineBuilder::new(config),
        &["enter_a", "exit_a", "exit_a1", "enter_a2"],
    )
    .build()
    .unwrap();

    let state = machine.initial_state().unwrap();
    let internal = machine.transition(&state, "INNER").unwrap();
    assert_eq!(internal.actions(), ["exit_a1", "enter_a2"]);

    let external = machine.transition(&state, "OUTER").unwrap();
    assert_eq!(external.actions(), ["exit_a1", "exit_a", "enter_a", "enter_a2"]);
    assert!(external.matches("a.a2"));
}

#[test]
fn targetless_transition_runs_actions_only() {
    let config = StateConfig::new("m")
        .initial("a")
        .state(
            StateConfig::new("a")
                .entry("enter_a")
                .exit("exit_a")
                .on_transition("TICK", TransitionConfig::targetless().action("tick")),
        );
    let machine = noop_actions(MachineBuilder::new(config), &["enter_a", "exit_a", "tick"])
        .build()
        .unwrap();

    let state = machine.initial_state().unwrap();
    let next = machine.transition(&state, "TICK").unwrap();
    assert_eq!(next.actions(), ["tick"]);
    assert_eq!(next.configuration(), state.configuration());
    assert!(next.changed());
}

fn player(mode: HistoryMode) -> Machine<()> {
    let config = StateConfig::new("player")
        .initial("off")
        .state(StateConfig::new("off").on("POWER", "on.hist"))
        .state(
            StateConfig::new("on")
                .initial("first")
                .on("POWER", "off")
                .state(StateConfig::new("first").on("NEXT", "second"))
                .state(
                    StateConfig::new("second")
                        .initial("s1")
                        .state(StateConfig::new("s1").on("DEEPER", "s2"))
                        .state(StateConfig::new("s2")),
                )
                .state(StateConfig::new("hist").history(mode)),
        );
    MachineBuilder::new(config).build().unwrap()
}

fn run(machine: &Machine<()>, events: &[&str]) -> State<()> {
    let state = machine.initial_state().unwrap();
    events
        .iter()
        .fold(state, |state, event| machine.transition(&state, *event).unwrap())
}

#[test]
fn history_falls_back_to_initial_child() {
    let machine = player(HistoryMode::Shallow);
    assert!(run(&machine, &["POWER"]).matches("on.first"));
}

#[test]
fn shallow_history_restores_child_with_its_initial() {
    let machine = player(HistoryMode::Shallow);
    let state = run(&machine, &["POWER", "NEXT", "DEEPER", "POWER", "POWER"]);
    assert!(state.matches("on.second.s1"));
}

#[test]
fn deep_history_restores_nested_configuration() {
    let machine = player(HistoryMode::Deep);
    let state = run(&machine, &["POWER", "NEXT", "DEEPER", "POWER"]);
    assert!(state.matches("off"));
    assert_eq!(state.history_value().len(), 1);

    let state = machine.transition(&state, "POWER").unwrap();
    assert!(state.matches("on.second.s2"));
}

#[test]
fn parallel_completion_raises_done_for_the_parallel_state() {
    let config = StateConfig::new("m")
        .initial("job")
        .state(
            StateConfig::new("job")
                .parallel()
                .on_done("complete")
                .state(
                    StateConfig::new("upload")
                        .initial("pending")
                        .state(StateConfig::new("pending").on("UPLOADED", "finished"))
                        .state(StateConfig::new("finished").final_state()),
                )
                .state(
                    StateConfig::new("scan")
                        .initial("pending")
                        .state(StateConfig::new("pending").on("SCANNED", "finished"))
                        .state(StateConfig::new("finished").final_state()),
                ),
        )
        .state(StateConfig::new("complete").final_state());
    let machine = MachineBuilder::<()>::new(config).build().unwrap();

    let state = run(&machine, &["UPLOADED"]);
    assert!(state.matches("job.upload.finished"));
    assert!(state.matches("job.scan.pending"));
    assert!(!state.done());

    let state = machine.transition(&state, "SCANNED").unwrap();
    assert!(state.matches("complete"));
    assert!(state.done());
}

#[test]
fn assignments_are_visible_to_later_actions_and_guards() {
    let config = StateConfig::new("m")
        .initial("a")
        .state(
            StateConfig::new("a").on_transition(
                "GO",
                TransitionConfig::to("b").action("double").action("add_one"),
            ),
        )
        .state(
            StateConfig::new("b")
                .always(TransitionConfig::to("big").guard("over_ten"))
                .always("small"),
        )
        .state(StateConfig::new("big"))
        .state(StateConfig::new("small"));

    let machine = MachineBuilder::new(config)
        .context(5i64)
        .action("double", Action::assign(|n: &i64, _: &Event| n * 2))
        .action("add_one", Action::assign(|n: &i64, _: &Event| n + 1))
        .guard("over_ten", Guard::context(|n: &i64| *n > 10))
        .build()
        .unwrap();

    let state = machine.initial_state().unwrap();
    let state = machine.transition(&state, "GO").unwrap();
    assert_eq!(*state.context(), 11);
    assert!(state.matches("big"));
}

#[test]
fn raised_cycle_is_reported_as_definition_defect() {
    let config = StateConfig::new("m")
        .initial("ping")
        .state(
            StateConfig::new("ping")
                .entry(ActionConfig::raise(Event::new("BOUNCE")))
                .on("BOUNCE", "pong"),
        )
        .state(
            StateConfig::new("pong")
                .entry(ActionConfig::raise(Event::new("BOUNCE")))
                .on("BOUNCE", "ping"),
        );
    let machine = MachineBuilder::<()>::new(config).build().unwrap();

    let err = machine.initial_state().unwrap_err();
    assert!(matches!(err, ExecutionError::Cycle { .. }), "{err}");
    assert!(err.is_definition_defect());
}

#[test]
fn unresolved_target_prevents_construction() {
    let config = StateConfig::new("m")
        .initial("a")
        .state(StateConfig::new("a").on("GO", "#nowhere"));

    let err = MachineBuilder::<()>::new(config).build().unwrap_err();
    assert_eq!(err.problems().len(), 1);
    assert!(err.to_string().contains("nowhere"));
}
