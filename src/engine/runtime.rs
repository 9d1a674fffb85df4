// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{MakeError, Result};
use crate::exec::JobRunner;
use crate::graph::NodeId;
use crate::make::{BuildReport, JobRequest, Scheduler};

use super::RuntimeEvent;

/// Drives the pure [`Scheduler`] in response to `RuntimeEvent`s, and
/// delegates recipe execution to a `JobRunner`.
///
/// This is the completion queue of the build: job runners never touch
/// node state, they only send `JobCompleted`, and the runtime feeds those
/// into the scheduler one at a time.
pub struct Runtime<R: JobRunner> {
    scheduler: Scheduler,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    runner: R,
    shutdown: bool,
}

impl<R: JobRunner> fmt::Debug for Runtime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

impl<R: JobRunner> Runtime<R> {
    pub fn new(scheduler: Scheduler, event_rx: mpsc::Receiver<RuntimeEvent>, runner: R) -> Self {
        Self {
            scheduler,
            event_rx,
            runner,
            shutdown: false,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Whether a shutdown was requested during any build so far.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown
    }

    /// Build `goals` and wait until nothing is running any more.
    ///
    /// - Starts every job the scheduler hands out.
    /// - Feeds each completion back into the scheduler.
    /// - On shutdown, stops starting jobs but still waits for running ones.
    pub async fn make(&mut self, goals: &[NodeId]) -> Result<BuildReport> {
        if self.shutdown {
            self.scheduler.abort();
        }
        let root = self.scheduler.prepare(goals);
        info!(goals = goals.len(), %root, "build started");

        loop {
            let step = self.scheduler.start_jobs();
            self.dispatch(step.jobs).await?;

            if self.scheduler.is_finished() {
                break;
            }

            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    return Err(MakeError::Other(anyhow::anyhow!(
                        "runtime event channel closed with {} job(s) outstanding",
                        self.scheduler.outstanding_jobs()
                    )));
                }
            };
            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::JobCompleted { node, outcome } => {
                    self.scheduler.complete(node, outcome);
                }
                RuntimeEvent::ShutdownRequested => {
                    warn!("shutdown requested; waiting for running jobs");
                    self.shutdown = true;
                    self.scheduler.abort();
                }
            }
        }

        let mut report = self.scheduler.finish();
        report.interrupted = self.shutdown;
        info!(
            errors = report.errors,
            cycles = report.cycles.len(),
            interrupted = report.interrupted,
            "build finished"
        );
        Ok(report)
    }

    async fn dispatch(&mut self, jobs: Vec<JobRequest>) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = jobs.iter().map(|j| j.name.as_str()).collect();
        debug!(?names, outstanding = self.scheduler.outstanding_jobs(), "dispatching jobs");

        self.runner.spawn_jobs(jobs).await
    }
}
