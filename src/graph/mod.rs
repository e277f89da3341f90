//! Test-plan search over a machine's reachable state graph.
//!
//! States are nodes, candidate events are edges. Nodes are identified by a
//! fingerprint (see [`SearchOptions::serialize_state`]); the search keeps a
//! visited set keyed by fingerprint, so self-loops and cycles terminate.

mod options;
mod plan;
mod search;

pub use options::{default_event_fingerprint, default_state_fingerprint, SearchOptions};
pub use plan::{Plan, Plans, Step};
pub use search::{adjacency_map, shortest_plans, shortest_plans_to, simple_plans};

use crate::engine::ExecutionError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SearchError {
    #[error("Search exceeded the limit of {limit}")]
    LimitExceeded { limit: usize },

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
