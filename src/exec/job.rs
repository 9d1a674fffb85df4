// src/exec/job.rs

//! Runs the recipe of a single node.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{JobOutcome, RuntimeEvent};
use crate::make::JobRequest;

/// One recipe line with its `@`, `-` and `+` prefixes stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub text: String,
    /// `@`: do not echo.
    pub silent: bool,
    /// `-`: a failure does not fail the job.
    pub ignore_errors: bool,
    /// `+`: run even under `-n`.
    pub always: bool,
}

impl CommandLine {
    /// Split the prefixes off `line`, folding in the job-wide attributes.
    pub fn parse(line: &str, job: &JobRequest) -> Self {
        let mut cmd = CommandLine {
            text: String::new(),
            silent: job.silent,
            ignore_errors: job.ignore_errors,
            always: false,
        };
        let mut rest = line.trim_start();
        loop {
            match rest.chars().next() {
                Some('@') => cmd.silent = true,
                Some('-') => cmd.ignore_errors = true,
                Some('+') => cmd.always = true,
                _ => break,
            }
            rest = rest[1..].trim_start();
        }
        cmd.text = rest.to_string();
        cmd
    }
}

/// Run a job and report its outcome on `runtime_tx`.
///
/// Failures to even start a line are reported as `Failed(-1)`.
pub async fn run_job(job: JobRequest, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let node = job.node;
    let name = job.name.clone();

    let outcome = match run_job_inner(&job).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(node = %name, error = %err, "job execution error");
            JobOutcome::Failed(-1)
        }
    };

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::JobCompleted { node, outcome })
        .await
    {
        error!(node = %name, error = %err, "runtime gone; completion dropped");
    }
}

async fn run_job_inner(job: &JobRequest) -> Result<JobOutcome> {
    info!(node = %job.name, lines = job.commands.len(), "starting job");

    for line in &job.commands {
        let cmd = CommandLine::parse(line, job);
        if cmd.text.is_empty() {
            continue;
        }
        if !cmd.silent || (job.no_execute && !cmd.always) {
            println!("{}", cmd.text);
        }
        if job.no_execute && !cmd.always {
            continue;
        }

        let code = run_line(&job.name, &cmd.text).await?;
        if code == 0 {
            continue;
        }
        if cmd.ignore_errors {
            warn!(node = %job.name, exit_code = code, "error code (ignored)");
            continue;
        }
        info!(node = %job.name, exit_code = code, "job failed");
        return Ok(JobOutcome::Failed(code));
    }

    debug!(node = %job.name, "job finished");
    Ok(JobOutcome::Success)
}

/// Run one line through `sh -c`, relaying its output line by line so
/// parallel jobs do not interleave within a line.
async fn run_line(name: &str, text: &str) -> Result<i32> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(text)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning shell for '{name}'"))?;

    let stdout = child.stdout.take().map(|out| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{line}");
            }
        })
    });
    let stderr = child.stderr.take().map(|err| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{line}");
            }
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for shell of '{name}'"))?;

    for relay in [stdout, stderr].into_iter().flatten() {
        if let Err(err) = relay.await {
            debug!(node = %name, error = %err, "output relay ended abnormally");
        }
    }

    Ok(status.code().unwrap_or(-1))
}
