// src/exec/backend.rs

//! Pluggable job runner abstraction.
//!
//! The runtime talks to a `JobRunner` instead of spawning processes itself.
//! `ShellJobRunner` forwards jobs to the background executor loop; tests
//! provide runners that record jobs and emit `JobCompleted` directly.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::make::JobRequest;

use super::executor_loop::spawn_executor;

/// Trait abstracting how jobs are executed.
///
/// Every dispatched job must eventually be answered by exactly one
/// `RuntimeEvent::JobCompleted` for its node, or the build never finishes.
pub trait JobRunner: Send {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<JobRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production runner executing recipes through `sh -c`.
pub struct ShellJobRunner {
    tx: mpsc::Sender<JobRequest>,
}

impl ShellJobRunner {
    /// Spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(runtime_tx);
        Self { tx }
    }
}

impl JobRunner for ShellJobRunner {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<JobRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for job in jobs {
                tx.send(job).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
