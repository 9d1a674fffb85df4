// src/make/scheduler.rs

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, trace, warn};

use crate::engine::JobOutcome;
use crate::errors::MakeError;
use crate::graph::{GraphStore, MadeState, NodeId, NodeType};
use crate::make::context::BuildContext;
use crate::make::expand::{expand_use, process_wait};
use crate::make::out_of_date::is_out_of_date;
use crate::make::status::{self, BuildReport};
use crate::make::tokens::TokenPool;
use crate::make::vars::bind_local_vars;
use crate::types::ChildOrder;

/// A stale node handed to the job runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub node: NodeId,
    /// Name plus cohort number, for diagnostics.
    pub name: String,
    /// File the recipe is expected to produce (`.TARGET`).
    pub target: String,
    /// Recipe lines with local variables substituted.
    pub commands: Vec<String>,
    /// `.SILENT` or `-s`: do not echo lines.
    pub silent: bool,
    /// `.IGNORE` or `-i`: failing lines do not fail the job.
    pub ignore_errors: bool,
    /// `-n`: echo lines without running them, except `+` lines.
    pub no_execute: bool,
}

/// Structured result of one [`Scheduler::start_jobs`] pass.
#[derive(Debug, Clone, Default)]
pub struct StartStep {
    /// Jobs to dispatch; each holds one token until completed.
    pub jobs: Vec<JobRequest>,
    /// Query mode found a stale node; the build stops here.
    pub query_out_of_date: bool,
}

/// The build frontier and everything needed to advance it.
///
/// The scheduler is pure and synchronous: it never runs anything itself.
/// [`start_jobs`](Scheduler::start_jobs) examines requested nodes and
/// returns jobs to run; the caller reports each job back through
/// [`complete`](Scheduler::complete). Up-to-date nodes are completed inline.
#[derive(Debug)]
pub struct Scheduler {
    ctx: BuildContext,
    frontier: VecDeque<NodeId>,
    tokens: TokenPool,
    /// Bumped on every completion; a node is examined at most once per value.
    checked_seqno: u64,
    errors: usize,
    aborting: bool,
    query_out_of_date: bool,
    problems: Vec<MakeError>,
    failed_jobs: Vec<(String, i32)>,
    goals: Vec<NodeId>,
    rng: StdRng,
    transitions: Vec<(NodeId, MadeState)>,
}

impl Scheduler {
    pub fn new(ctx: BuildContext) -> Self {
        let rng = match ctx.options.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let tokens = TokenPool::new(ctx.options.jobs);
        Self {
            ctx,
            frontier: VecDeque::new(),
            tokens,
            checked_seqno: 1,
            errors: 0,
            aborting: false,
            query_out_of_date: false,
            problems: Vec::new(),
            failed_jobs: Vec::new(),
            goals: Vec::new(),
            rng,
            transitions: Vec::new(),
        }
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut BuildContext {
        &mut self.ctx
    }

    pub fn graph(&self) -> &GraphStore {
        &self.ctx.graph
    }

    /// Every made-state change so far, in order.
    pub fn transitions(&self) -> &[(NodeId, MadeState)] {
        &self.transitions
    }

    pub fn outstanding_jobs(&self) -> usize {
        self.tokens.outstanding()
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn is_aborting(&self) -> bool {
        self.aborting
    }

    /// Stop starting jobs; running ones are still awaited.
    pub fn abort(&mut self) {
        if !self.aborting {
            info!("aborting build; waiting for running jobs");
        }
        self.aborting = true;
    }

    /// True once nothing is running and nothing more can start.
    pub fn is_finished(&self) -> bool {
        self.tokens.outstanding() == 0
            && (self.frontier.is_empty() || self.aborting || self.query_out_of_date)
    }

    /// Prepare a build of `goals` and request the synthetic root.
    pub fn prepare(&mut self, goals: &[NodeId]) -> NodeId {
        expand_use(&mut self.ctx, goals);
        let root = process_wait(&mut self.ctx.graph, goals);
        self.goals = goals.to_vec();
        self.build_child(root, &mut 0);
        debug!(goals = goals.len(), nodes = self.ctx.graph.len(), "build prepared");
        root
    }

    fn set_made(&mut self, id: NodeId, state: MadeState) {
        trace!(node = %self.ctx.graph.node(id).display_name(), ?state, "made state");
        self.ctx.graph.node_mut(id).made = state;
        self.transitions.push((id, state));
    }

    /// Examine requested nodes until the frontier is empty or no token is
    /// left.
    pub fn start_jobs(&mut self) -> StartStep {
        let mut step = StartStep::default();
        let mut have_token = false;

        while !self.frontier.is_empty() {
            if !have_token && !self.tokens.withdraw(self.aborting) {
                break;
            }
            have_token = true;

            let Some(id) = self.frontier.pop_front() else {
                break;
            };
            let node = self.ctx.graph.node(id);
            trace!(node = %node.display_name(), "examining");

            if node.made != MadeState::Requested {
                warn!(node = %node.display_name(), state = ?node.made, "unexpected state on frontier");
                continue;
            }
            if node.checked_seqno == self.checked_seqno {
                trace!(node = %node.display_name(), "already checked");
                self.set_made(id, MadeState::Deferred);
                continue;
            }
            let unmade = node.unmade;
            self.ctx.graph.node_mut(id).checked_seqno = self.checked_seqno;

            if unmade != 0 {
                self.set_made(id, MadeState::Deferred);
                self.make_children(id);
                continue;
            }

            self.set_made(id, MadeState::BeingMade);
            if !is_out_of_date(&mut self.ctx, id) {
                self.set_made(id, MadeState::UpToDate);
                if self.ctx.graph.node(id).kind.contains(NodeType::JOIN) {
                    bind_local_vars(&mut self.ctx.graph, id, self.ctx.now);
                }
                self.make_update(id);
                continue;
            }

            if self.ctx.options.query {
                if !self.is_root(id) {
                    info!(node = %self.ctx.graph.node(id).display_name(), "out of date");
                    step.query_out_of_date = true;
                    self.query_out_of_date = true;
                    break;
                }
                self.set_made(id, MadeState::Made);
                self.make_update(id);
                continue;
            }

            if !self.check_commands(id) {
                self.set_made(id, MadeState::Error);
                self.errors += 1;
                if !self.ctx.options.keep_going {
                    self.abort();
                }
                continue;
            }

            bind_local_vars(&mut self.ctx.graph, id, self.ctx.now);
            let node = self.ctx.graph.node(id);
            if node.commands.is_empty() {
                self.set_made(id, MadeState::Made);
                self.make_update(id);
                continue;
            }

            let kind = node.kind;
            let options = &self.ctx.options;
            let job = JobRequest {
                node: id,
                name: node.display_name(),
                target: node.vars.target.clone().unwrap_or_else(|| node.path_or_name()),
                commands: node.commands.iter().map(|c| node.vars.expand(c)).collect(),
                silent: options.silent || kind.contains(NodeType::SILENT),
                ignore_errors: options.ignore_errors || kind.contains(NodeType::IGNORE),
                no_execute: options.no_execute && !kind.contains(NodeType::MAKE),
            };
            debug!(node = %job.name, lines = job.commands.len(), "out of date; starting job");
            step.jobs.push(job);
            have_token = false;
        }

        if have_token {
            self.tokens.give_back();
        }
        step
    }

    fn is_root(&self, id: NodeId) -> bool {
        let node = self.ctx.graph.node(id);
        node.name == ".MAIN" && node.parents.is_empty() && !self.goals.contains(&id)
    }

    /// Ensure a stale node has something to run, borrowing the `.DEFAULT`
    /// recipe if needed. Returns `false` for a missing source nobody knows
    /// how to make.
    fn check_commands(&mut self, id: NodeId) -> bool {
        let node = self.ctx.graph.node(id);
        if node.is_target() || !node.commands.is_empty() {
            return true;
        }
        if node.kind.contains(NodeType::LIB) && !node.children.is_empty() {
            return true;
        }
        let special = node.kind.contains(NodeType::SPECIAL);

        if let Some(default) = self.ctx.default_node
            && !special
            && !self.ctx.graph.node(default).commands.is_empty()
        {
            debug!(node = %self.ctx.graph.name(id), "using .DEFAULT recipe");
            self.ctx.graph.apply_use(default, id);
            let node = self.ctx.graph.node_mut(id);
            node.vars.impsrc = node.vars.target.clone();
            return true;
        }

        self.ctx.update_mtime(id, false);
        let node = self.ctx.graph.node(id);
        if node.exists() || special {
            return true;
        }

        let name = node.display_name();
        if node.kind.contains(NodeType::OPTIONAL) {
            warn!(node = %name, "don't know how to make (ignored)");
            return true;
        }
        if self.ctx.options.keep_going {
            warn!(node = %name, "don't know how to make (continuing)");
        } else {
            error!(node = %name, "don't know how to make. Stop");
        }
        self.problems.push(MakeError::DontKnowHowToMake(name));
        false
    }

    fn make_children(&mut self, id: NodeId) {
        let mut children = self.ctx.graph.node(id).children.clone();
        if self.ctx.options.child_order == ChildOrder::Random {
            children.shuffle(&mut self.rng);
        }
        let mut insert_at = 0;
        for child in children {
            if self.build_child(child, &mut insert_at) {
                break;
            }
        }
    }

    /// Request `id` unless it is already past the queue or waiting for a
    /// `.ORDER` predecessor. Requested nodes go to the front of the frontier
    /// at `insert_at`, keeping sibling order.
    ///
    /// Returns `true` for a `.WAIT` barrier that still has unmade children,
    /// which ends the scan of the current child list.
    fn build_child(&mut self, id: NodeId, insert_at: &mut usize) -> bool {
        if self.ctx.graph.node(id).made.is_ready() {
            return false;
        }
        if self.is_waiting_for_order(id) {
            self.set_made(id, MadeState::Deferred);
            return false;
        }

        trace!(node = %self.ctx.graph.node(id).display_name(), "requesting");
        self.set_made(id, MadeState::Requested);
        self.frontier.insert(*insert_at, id);
        *insert_at += 1;

        let node = self.ctx.graph.node(id);
        if node.unmade_cohorts != 0 {
            for cohort in node.cohorts.clone() {
                if self.build_child(cohort, insert_at) {
                    break;
                }
            }
        }

        let node = self.ctx.graph.node(id);
        node.kind.contains(NodeType::WAIT) && node.unmade > 0
    }

    fn is_waiting_for_order(&self, id: NodeId) -> bool {
        self.ctx.graph.node(id).order_pred.iter().any(|p| {
            let pred = self.ctx.graph.node(*p);
            if (pred.made.is_done() && pred.unmade_cohorts == 0) || !pred.flags.remake {
                return false;
            }
            trace!(
                node = %self.ctx.graph.name(id),
                waiting_for = %pred.display_name(),
                "waiting for .ORDER predecessor"
            );
            true
        })
    }

    /// Report a finished job.
    pub fn complete(&mut self, id: NodeId, outcome: JobOutcome) {
        self.tokens.give_back();

        let node = self.ctx.graph.node(id);
        if node.made != MadeState::BeingMade {
            warn!(node = %node.display_name(), state = ?node.made, "completion for node not being made");
            return;
        }
        let name = node.display_name();

        match outcome {
            JobOutcome::Success => {
                self.set_made(id, MadeState::Made);
                self.make_update(id);
            }
            JobOutcome::Failed(code) if self.ctx.options.ignore_errors => {
                warn!(node = %name, exit_code = code, "error ignored");
                self.set_made(id, MadeState::Made);
                self.make_update(id);
            }
            JobOutcome::Failed(code) => {
                error!(node = %name, exit_code = code, "job failed");
                self.set_made(id, MadeState::Error);
                self.errors += 1;
                self.failed_jobs.push((name, code));
                if !self.ctx.options.keep_going {
                    self.abort();
                }
            }
        }
    }

    /// Propagate the completion of `id` to its parents.
    fn make_update(&mut self, id: NodeId) {
        self.checked_seqno += 1;

        let made = self.ctx.graph.node(id).made;
        let existed = made == MadeState::UpToDate || self.recheck(id);

        let centurion = match self.ctx.graph.node(id).centurion {
            Some(c) => {
                let cent = self.ctx.graph.node_mut(c);
                if cent.unmade_cohorts == 0 {
                    self.report_cycle(c);
                } else {
                    cent.unmade_cohorts -= 1;
                }
                c
            }
            None => id,
        };

        self.schedule_order_successors(centurion);

        let child_kind = self.ctx.graph.node(id).kind;
        for parent in self.ctx.graph.node(centurion).parents.clone() {
            let p = self.ctx.graph.node_mut(parent);
            if !p.flags.remake {
                continue;
            }
            if !existed && !child_kind.contains(NodeType::WAIT) {
                p.flags.force = true;
            }
            if p.kind.contains(NodeType::MADE) {
                continue;
            }
            if !child_kind.intersects(NodeType::EXEC | NodeType::USE | NodeType::USEBEFORE) {
                if made == MadeState::Made {
                    p.flags.child_made = true;
                }
                self.ctx.graph.update_youngest_child(parent, id);
            }

            let cent = self.ctx.graph.node(centurion);
            if cent.unmade_cohorts != 0 || !cent.made.is_done() {
                trace!(
                    centurion = %cent.name,
                    unmade_cohorts = cent.unmade_cohorts,
                    "waiting for remaining cohorts"
                );
                continue;
            }
            let cent_kind = cent.kind;
            let cent_done_order = cent.flags.done_order;

            let p = self.ctx.graph.node_mut(parent);
            if p.unmade == 0 {
                self.report_cycle(parent);
                continue;
            }
            p.unmade -= 1;

            if p.unmade != 0 && !cent_kind.contains(NodeType::WAIT) && !cent_done_order {
                continue;
            }
            if p.made != MadeState::Deferred {
                continue;
            }
            if self.is_waiting_for_order(parent) {
                continue;
            }
            trace!(node = %self.ctx.graph.node(parent).display_name(), "parent ready");
            self.set_made(parent, MadeState::Requested);
            self.frontier.push_back(parent);
        }

        let node = self.ctx.graph.node(id);
        let impsrc = node.vars.target.clone().unwrap_or_else(|| node.path_or_name());
        let prefix = node.vars.prefix.clone();
        for parent in node.implicit_parents.clone() {
            let p = self.ctx.graph.node_mut(parent);
            if !p.flags.remake {
                continue;
            }
            p.vars.impsrc = Some(impsrc.clone());
            if let Some(prefix) = &prefix {
                p.vars.prefix = Some(prefix.clone());
            }
        }
    }

    /// A completion arrived for a node whose unmade count is already zero.
    /// Counts as an error, reported once per node.
    fn report_cycle(&mut self, id: NodeId) {
        let node = self.ctx.graph.node_mut(id);
        if node.flags.done_cycle {
            return;
        }
        node.flags.done_cycle = true;
        let name = node.display_name();
        error!(node = %name, "graph cycles through");
        self.problems.push(MakeError::GraphCycle(name));
        self.errors += 1;
    }

    /// Re-read the mtime of a node that was just made. A node still missing
    /// afterwards, or one that was only echoed, is dated to the start of the
    /// build. Returns whether the file exists.
    fn recheck(&mut self, id: NodeId) -> bool {
        self.ctx.update_mtime(id, true);
        let no_execute = self.ctx.options.no_execute;
        let now = self.ctx.now;

        let node = self.ctx.graph.node_mut(id);
        let existed = node.mtime.is_some();
        if (no_execute && !node.kind.contains(NodeType::MAKE)) || !existed {
            trace!(node = %node.name, "recheck: update time to now");
            node.mtime = Some(now);
        }
        existed
    }

    fn schedule_order_successors(&mut self, id: NodeId) {
        let mut insert_at = 0;
        for succ in self.ctx.graph.node(id).order_succ.clone() {
            if self.ctx.graph.node(succ).made == MadeState::Deferred
                && !self.build_child(succ, &mut insert_at)
            {
                self.ctx.graph.node_mut(succ).flags.done_order = true;
            }
        }
    }

    /// Close the current build and summarize it.
    pub fn finish(&mut self) -> BuildReport {
        let report = status::summarize(
            &mut self.ctx.graph,
            &self.goals,
            std::mem::take(&mut self.errors),
            std::mem::take(&mut self.problems),
            std::mem::take(&mut self.failed_jobs),
            self.query_out_of_date,
        );
        self.frontier.clear();
        self.query_out_of_date = false;
        report
    }
}
