// src/engine/mod.rs

//! Orchestration engine for makedag.
//!
//! The pure scheduling state machine lives in [`crate::make::Scheduler`];
//! [`runtime`] is the async shell around it that dispatches jobs and feeds
//! completions back in through a single event channel, so node state is
//! only ever touched from the runtime task.

use crate::graph::NodeId;

/// Outcome of a job for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed(i32),
}

/// Events flowing into the runtime from job runners and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A job finished with a concrete outcome.
    JobCompleted { node: NodeId, outcome: JobOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod runtime;

pub use runtime::Runtime;
