// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs the recipes of stale nodes with
//! `tokio::process::Command` and reports back to the runtime via
//! `RuntimeEvent`s.
//!
//! - [`backend`] provides the `JobRunner` trait and the production
//!   `ShellJobRunner`, which tests can replace with a fake.
//! - [`executor_loop`] owns the background loop spawning one task per job.
//! - [`job`] runs the lines of one recipe through the shell.

pub mod backend;
pub mod executor_loop;
pub mod job;

pub use backend::{JobRunner, ShellJobRunner};
pub use executor_loop::spawn_executor;
pub use job::{CommandLine, run_job};
