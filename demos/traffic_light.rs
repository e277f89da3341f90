//! Traffic Light Statechart
//!
//! This example drives a traffic light with a nested pedestrian signal
//! through an interpreter.
//!
//! Key concepts:
//! - Hierarchical states (red has walk/wait/stop substates)
//! - Guarded transitions reading both context and event payload
//! - Delayed transitions on a virtual clock
//! - Subscribing to published states
//!
//! Run with: cargo run --example traffic_light

use serde::{Deserialize, Serialize};
use statecraft::builder::{MachineBuilder, StateConfig, TransitionConfig};
use statecraft::core::{Action, Event, Guard};
use statecraft::interpreter::Interpreter;
use std::time::Duration;

#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
struct Light {
    elapsed: u32,
}

fn main() {
    println!("=== Traffic Light Statechart ===\n");

    let config = StateConfig::new("light")
        .initial("green")
        .state(StateConfig::new("green").after(3000, "yellow"))
        .state(StateConfig::new("yellow").after(1000, "red"))
        .state(
            StateConfig::new("red")
                .initial("walk")
                .after(4000, "green")
                .state(StateConfig::new("walk").on("PED_COUNTDOWN", "wait"))
                .state(
                    StateConfig::new("wait")
                        .on_transition("PED_COUNTDOWN", TransitionConfig::to("stop").guard("countdown_finished"))
                        .on_transition("PED_COUNTDOWN", TransitionConfig::targetless().action("tick")),
                )
                .state(StateConfig::new("stop")),
        );

    let machine = MachineBuilder::<Light>::new(config)
        .guard(
            "countdown_finished",
            Guard::new(|ctx: &Light, event: &Event| {
                event.get_i64("duration") == Some(0) && ctx.elapsed > 0
            }),
        )
        .action(
            "tick",
            Action::assign(|ctx: &Light, _: &Event| Light {
                elapsed: ctx.elapsed + 1,
            }),
        )
        .build()
        .unwrap();

    let mut interpreter = Interpreter::new(machine);
    interpreter.subscribe(|state| {
        println!("  -> {} (elapsed: {})", state.value(), state.context().elapsed);
    });

    println!("Starting:");
    interpreter.start().unwrap();

    println!("\nAfter 3s the light turns yellow, then red:");
    interpreter.advance_time(Duration::from_millis(4000)).unwrap();

    println!("\nPedestrian countdown:");
    interpreter.send("PED_COUNTDOWN").unwrap();
    for duration in [2, 1, 0] {
        interpreter
            .send(Event::new("PED_COUNTDOWN").with("duration", duration))
            .unwrap();
    }

    println!("\nRed times out back to green:");
    interpreter.advance_time(Duration::from_millis(4000)).unwrap();

    interpreter.stop().unwrap();
    println!("\nJournal ({} steps):", interpreter.journal().len());
    for step in interpreter.journal().steps() {
        println!("  {:<40} {} -> {}", step.event, step.from, step.to);
    }

    println!("\n=== Example Complete ===");
}
