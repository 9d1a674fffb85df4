// src/make/mod.rs

//! Out-of-date evaluation and build scheduling.
//!
//! - [`context`] bundles the graph, suffix registry and collaborators of
//!   one build invocation.
//! - [`expand`] prepares the graph below the goals before scheduling.
//! - [`out_of_date`] classifies a single node as current or stale.
//! - [`vars`] binds the node-local variables recipes refer to.
//! - [`tokens`] bounds the number of outstanding jobs.
//! - [`scheduler`] is the pure frontier state machine.
//! - [`status`] summarizes a finished build.

pub mod context;
pub mod expand;
pub mod out_of_date;
pub mod scheduler;
pub mod status;
pub mod tokens;
pub mod vars;

pub use context::{BuildContext, BuildOptions};
pub use out_of_date::is_out_of_date;
pub use scheduler::{JobRequest, Scheduler, StartStep};
pub use status::{BuildReport, GoalOutcome, GoalStatus};
pub use tokens::TokenPool;
