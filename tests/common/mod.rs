#![allow(dead_code)]

use makedag::graph::MadeState;
use makedag::make::Scheduler;

pub use makedag_test_utils::{NOW_SECS, init_tracing, mock_context};

/// Index of the first `state` transition of the node displayed as `name`.
pub fn first_transition(scheduler: &Scheduler, name: &str, state: MadeState) -> Option<usize> {
    let graph = scheduler.graph();
    scheduler
        .transitions()
        .iter()
        .position(|(id, s)| *s == state && graph.node(*id).display_name() == name)
}

/// Index of the last `state` transition of the node displayed as `name`.
pub fn last_transition(scheduler: &Scheduler, name: &str, state: MadeState) -> Option<usize> {
    let graph = scheduler.graph();
    scheduler
        .transitions()
        .iter()
        .rposition(|(id, s)| *s == state && graph.node(*id).display_name() == name)
}

/// Child names of `name`, in link order.
pub fn child_names(scheduler: &Scheduler, name: &str) -> Vec<String> {
    let graph = scheduler.graph();
    let id = graph
        .find(name)
        .unwrap_or_else(|| panic!("no node named {name}"));
    graph
        .node(id)
        .children
        .iter()
        .map(|c| graph.node(*c).display_name())
        .collect()
}
