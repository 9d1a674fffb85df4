use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use makedag::engine::{JobOutcome, RuntimeEvent};
use makedag::errors::Result;
use makedag::exec::JobRunner;
use makedag::fs::MockFileSystem;
use makedag::make::JobRequest;
use makedag::types::MTime;
use tokio::sync::mpsc;

use crate::NOW_SECS;

/// What a [`FakeJobRunner`] saw.
#[derive(Debug, Default, Clone)]
pub struct RunLog {
    /// Job names in dispatch order.
    pub executed: Vec<String>,
    /// Expanded recipe of each job, in dispatch order.
    pub commands: Vec<Vec<String>>,
    pub in_flight: usize,
    pub max_in_flight: usize,
    clock: u64,
}

/// A fake job runner that:
/// - records which jobs were "run" and how many overlapped
/// - optionally stamps each job's target in a `MockFileSystem`
/// - reports `JobCompleted`, failing the jobs it was told to fail.
///
/// Without a delay, completions are sent before `spawn_jobs` returns, so
/// the event channel must hold at least `jobs` events.
pub struct FakeJobRunner {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    log: Arc<Mutex<RunLog>>,
    fs: Option<MockFileSystem>,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl FakeJobRunner {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, log: Arc<Mutex<RunLog>>) -> Self {
        Self {
            runtime_tx,
            log,
            fs: None,
            failing: HashSet::new(),
            delay: None,
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

    /// Complete jobs from background tasks after `delay`, so that they
    /// genuinely overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl JobRunner for FakeJobRunner {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<JobRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let log = Arc::clone(&self.log);
        let fs = self.fs.clone();
        let failing = self.failing.clone();
        let delay = self.delay;

        Box::pin(async move {
            for job in jobs {
                {
                    let mut guard = log.lock().unwrap();
                    guard.executed.push(job.name.clone());
                    guard.commands.push(job.commands.clone());
                    guard.in_flight += 1;
                    guard.max_in_flight = guard.max_in_flight.max(guard.in_flight);
                }

                let outcome = if failing.contains(&job.name) {
                    JobOutcome::Failed(1)
                } else {
                    JobOutcome::Success
                };
                let finish = finish_job(job, outcome, Arc::clone(&log), fs.clone(), tx.clone());

                match delay {
                    Some(d) => {
                        tokio::spawn(async move {
                            tokio::time::sleep(d).await;
                            let _ = finish.await;
                        });
                    }
                    None => finish.await?,
                }
            }
            Ok(())
        })
    }
}

async fn finish_job(
    job: JobRequest,
    outcome: JobOutcome,
    log: Arc<Mutex<RunLog>>,
    fs: Option<MockFileSystem>,
    tx: mpsc::Sender<RuntimeEvent>,
) -> Result<()> {
    {
        let mut guard = log.lock().unwrap();
        guard.in_flight -= 1;
        guard.clock += 1;
        if let (Some(fs), JobOutcome::Success) = (&fs, outcome) {
            fs.touch(&job.target, MTime::from_secs(NOW_SECS + guard.clock));
        }
    }

    tx.send(RuntimeEvent::JobCompleted {
        node: job.node,
        outcome,
    })
    .await
    .map_err(anyhow::Error::from)?;
    Ok(())
}
