// src/exec/executor_loop.rs

//! Background loop that turns job requests into running processes.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::exec::job::run_job;
use crate::make::JobRequest;

/// Spawn the background executor loop.
///
/// Each job runs in its own Tokio task. The loop does no admission control
/// of its own: the scheduler's token pool already bounds how many jobs are
/// in flight.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<JobRequest> {
    let (tx, mut rx) = mpsc::channel::<JobRequest>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(job) = rx.recv().await {
            let rt_tx = runtime_tx.clone();
            let name = job.name.clone();
            tokio::spawn(async move {
                run_job(job, rt_tx).await;
                debug!(node = %name, "job runner future finished");
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
