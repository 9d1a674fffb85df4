#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};

use makedag::engine::JobOutcome;
use makedag::fs::MockFileSystem;
use makedag::graph::{MadeState, NodeId};
use makedag::make::{BuildContext, BuildReport, JobRequest, Scheduler};
use makedag::types::MTime;

use crate::NOW_SECS;

/// Drives a [`Scheduler`] to completion without any async runtime.
///
/// Jobs are "run" one at a time, in dispatch order by default, while the
/// scheduler keeps handing out new ones as tokens allow.
pub struct SyncDriver {
    pub scheduler: Scheduler,
    fs: Option<MockFileSystem>,
    failing: HashSet<String>,
    newest_first: bool,
    clock: u64,
    /// Job names in dispatch order.
    pub executed: Vec<String>,
    /// Largest number of jobs the scheduler had outstanding at once.
    pub max_outstanding: usize,
}

impl SyncDriver {
    pub fn new(ctx: BuildContext) -> Self {
        Self {
            scheduler: Scheduler::new(ctx),
            fs: None,
            failing: HashSet::new(),
            newest_first: false,
            clock: 0,
            executed: Vec::new(),
            max_outstanding: 0,
        }
    }

    /// Touch each successful job's target in `fs`.
    pub fn with_fs(mut self, fs: MockFileSystem) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Complete the most recently dispatched job first.
    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    pub fn id(&self, name: &str) -> NodeId {
        self.scheduler
            .graph()
            .find(name)
            .unwrap_or_else(|| panic!("no node named {name}"))
    }

    pub fn made(&self, name: &str) -> MadeState {
        self.scheduler.graph().node(self.id(name)).made
    }

    /// Build the named goals.
    pub fn run_names(&mut self, names: &[&str]) -> BuildReport {
        let goals: Vec<NodeId> = names.iter().map(|n| self.id(n)).collect();
        self.run(&goals)
    }

    /// Build the main targets.
    pub fn run_main(&mut self) -> BuildReport {
        let goals = self.scheduler.graph().main_targets().to_vec();
        self.run(&goals)
    }

    pub fn run(&mut self, goals: &[NodeId]) -> BuildReport {
        self.scheduler.prepare(goals);
        let mut pending: VecDeque<JobRequest> = VecDeque::new();

        loop {
            let step = self.scheduler.start_jobs();
            pending.extend(step.jobs);
            self.max_outstanding = self.max_outstanding.max(self.scheduler.outstanding_jobs());

            let next = if self.newest_first {
                pending.pop_back()
            } else {
                pending.pop_front()
            };
            let Some(job) = next else {
                break;
            };
            self.finish_job(job);
        }
        self.scheduler.finish()
    }

    fn finish_job(&mut self, job: JobRequest) {
        self.executed.push(job.name.clone());
        let outcome = if self.failing.contains(&job.name) {
            JobOutcome::Failed(1)
        } else {
            self.clock += 1;
            if let Some(fs) = &self.fs {
                fs.touch(&job.target, MTime::from_secs(NOW_SECS + self.clock));
            }
            JobOutcome::Success
        };
        self.scheduler.complete(job.node, outcome);
    }
}
