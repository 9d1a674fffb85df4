// src/make/status.rs

//! End-of-build summary: goal outcomes, failure propagation and cycle
//! reporting.

use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{error, info};

use crate::errors::MakeError;
use crate::graph::{GraphStore, MadeState, NodeId};

/// How a single goal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalOutcome {
    /// A recipe ran for the goal (or something below it).
    Made,
    UpToDate,
    /// The goal, or something it depends on, failed.
    NotRemade,
    /// Never reached a terminal state; see [`BuildReport::cycles`].
    Unfinished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalStatus {
    pub name: String,
    pub outcome: GoalOutcome,
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            GoalOutcome::Made => write!(f, "`{}' made", self.name),
            GoalOutcome::UpToDate => write!(f, "`{}' is up to date", self.name),
            GoalOutcome::NotRemade => {
                write!(f, "`{}' not remade because of errors", self.name)
            }
            GoalOutcome::Unfinished => write!(f, "`{}' was not built", self.name),
        }
    }
}

/// Result of one build phase.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub goals: Vec<GoalStatus>,
    /// Failed jobs plus unbuildable sources.
    pub errors: usize,
    pub problems: Vec<MakeError>,
    /// `(node, exit code)` of every failed recipe.
    pub failed_jobs: Vec<(String, i32)>,
    /// Node names of each dependency cycle that kept goals from finishing.
    pub cycles: Vec<Vec<String>>,
    /// Query mode stopped at an out-of-date node.
    pub query_out_of_date: bool,
    /// A shutdown was requested before every goal finished.
    pub interrupted: bool,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        self.errors == 0
            && self.cycles.is_empty()
            && !self.query_out_of_date
            && !self.interrupted
    }

    /// Process exit status: 0 on success, 1 when a query found stale
    /// targets, 2 on errors or interruption.
    pub fn exit_code(&self) -> i32 {
        if self.errors > 0 || !self.cycles.is_empty() || self.interrupted {
            2
        } else if self.query_out_of_date {
            1
        } else {
            0
        }
    }

    /// Fold a later phase (`.END`) into this report.
    pub fn merge(&mut self, other: BuildReport) {
        self.goals.extend(other.goals);
        self.errors += other.errors;
        self.problems.extend(other.problems);
        self.failed_jobs.extend(other.failed_jobs);
        self.cycles.extend(other.cycles);
        self.query_out_of_date |= other.query_out_of_date;
        self.interrupted |= other.interrupted;
    }
}

pub(crate) fn summarize(
    graph: &mut GraphStore,
    goals: &[NodeId],
    errors: usize,
    problems: Vec<MakeError>,
    failed_jobs: Vec<(String, i32)>,
    query_out_of_date: bool,
) -> BuildReport {
    propagate_aborted(graph);

    let mut report = BuildReport {
        errors,
        problems,
        failed_jobs,
        query_out_of_date,
        ..BuildReport::default()
    };

    if errors == 0 && !query_out_of_date {
        report.cycles = find_cycles(graph);
        for cycle in &report.cycles {
            error!(nodes = %cycle.join(", "), "graph cycles through");
            report.problems.push(MakeError::GraphCycle(cycle.join(", ")));
        }
    }

    for &goal in goals {
        let node = graph.node(goal);
        let outcome = match node.made {
            MadeState::Made => GoalOutcome::Made,
            MadeState::UpToDate if node.flags.child_made => GoalOutcome::Made,
            MadeState::UpToDate => GoalOutcome::UpToDate,
            MadeState::Error | MadeState::Aborted => GoalOutcome::NotRemade,
            _ if errors > 0 => GoalOutcome::NotRemade,
            _ => GoalOutcome::Unfinished,
        };
        let status = GoalStatus {
            name: node.display_name(),
            outcome,
        };
        if !query_out_of_date {
            info!("{status}");
        }
        report.goals.push(status);
    }
    report
}

/// Mark every remade node below a failure as aborted, to a fixpoint.
/// A `::` target counts as failed when any of its cohorts failed.
fn propagate_aborted(graph: &mut GraphStore) {
    loop {
        let mut changed = false;
        let ids: Vec<NodeId> = graph.ids().collect();
        for id in ids {
            let node = graph.node(id);
            if !node.flags.remake || node.made.is_done() {
                continue;
            }
            let failed_below = node.children.iter().chain(node.cohorts.iter()).any(|c| {
                let child = graph.node(*c);
                child.made.is_failure()
                    || child.cohorts.iter().any(|k| graph.node(*k).made.is_failure())
            });
            if failed_below {
                graph.node_mut(id).made = MadeState::Aborted;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Strongly connected components among the nodes that were meant to be
/// remade but never finished.
fn find_cycles(graph: &GraphStore) -> Vec<Vec<String>> {
    let pending = |id: NodeId| {
        let node = graph.node(id);
        node.flags.remake && !node.made.is_done()
    };

    let mut edges: DiGraphMap<NodeId, ()> = DiGraphMap::new();
    for id in graph.ids().filter(|id| pending(*id)) {
        edges.add_node(id);
        let node = graph.node(id);
        for &child in node.children.iter().chain(node.order_pred.iter()) {
            if pending(child) {
                edges.add_edge(id, child, ());
            }
        }
    }

    tarjan_scc(&edges)
        .into_iter()
        .filter(|scc| scc.len() > 1 || edges.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort();
            scc.into_iter()
                .map(|id| graph.node(id).display_name())
                .collect()
        })
        .collect()
}
