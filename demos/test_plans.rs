//! Test Plan Generation
//!
//! This example searches the reachable states of a small checkout flow and
//! prints the shortest event sequence reaching each of them.
//!
//! Key concepts:
//! - Breadth-first plan search
//! - Event cases (one candidate event per payload)
//! - Goal-directed search with a predicate
//! - Adjacency map of the explored graph
//!
//! Run with: cargo run --example test_plans

use serde_json::json;
use statecraft::builder::{MachineBuilder, StateConfig, TransitionConfig};
use statecraft::core::{Event, Guard};
use statecraft::graph::{adjacency_map, shortest_plans, shortest_plans_to, SearchOptions};

fn main() {
    println!("=== Test Plan Generation ===\n");

    let config = StateConfig::new("checkout")
        .initial("cart")
        .state(StateConfig::new("cart").on("CHECKOUT", "payment"))
        .state(
            StateConfig::new("payment")
                .on("BACK", "cart")
                .on_transition("PAY", TransitionConfig::to("confirmed").guard("card_accepted"))
                .on("PAY", "declined"),
        )
        .state(StateConfig::new("declined").on("RETRY", "payment"))
        .state(StateConfig::new("confirmed").final_state());

    let machine = MachineBuilder::<()>::new(config)
        .guard(
            "card_accepted",
            Guard::event(|e: &Event| e.get_str("card") == Some("valid")),
        )
        .build()
        .unwrap();

    let options = SearchOptions::new()
        .events(vec![
            Event::new("CHECKOUT"),
            Event::new("BACK"),
            Event::new("RETRY"),
        ])
        .event_cases("PAY", vec![json!({"card": "valid"}), json!({"card": "expired"})]);

    println!("Shortest plan to every reachable state:");
    for plan in &shortest_plans(&machine, &options).unwrap() {
        println!("  {:<14} via {:?}", plan.state.value().to_string(), plan.event_types());
    }

    println!("\nPlans reaching a final state:");
    for plan in shortest_plans_to(&machine, &options, |s| s.done()).unwrap() {
        let steps: Vec<String> = plan.steps.iter().map(|s| s.event.to_string()).collect();
        println!("  {}", steps.join(" -> "));
    }

    println!("\nAdjacency:");
    for (state, edges) in adjacency_map(&machine, &options).unwrap() {
        println!("  {state}");
        for (event, next) in edges {
            if next != state {
                println!("    {event:<28} => {next}");
            }
        }
    }

    println!("\n=== Example Complete ===");
}
