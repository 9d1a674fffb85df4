// src/suffix/mod.rs

//! Suffix transformation rules and implicit source inference.
//!
//! - [`registry`] keeps the ordered suffix list and the graph of
//!   transformation rules between suffixes.
//! - [`candidate`] is the scratch arena used by one resolution call.
//! - [`resolver`] searches the transformation graph for a chain of rules
//!   leading from a target to an existing file and commits it to the
//!   build graph.

pub mod candidate;
pub mod registry;
pub mod resolver;

pub use registry::{Suffix, SuffixFlags, SuffixId, SuffixRegistry};
pub use resolver::Resolver;
