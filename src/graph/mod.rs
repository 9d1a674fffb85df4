// src/graph/mod.rs

//! The Graph Store.
//!
//! - [`node`] defines the vertex type, its attribute bitset and made-state.
//! - [`store`] owns every node of one build invocation in an arena.
//! - [`vars`] holds node-local variables and their recipe substitution.

pub mod node;
pub mod store;
pub mod vars;

pub use node::{MadeState, Node, NodeFlags, NodeId, NodeType};
pub use store::GraphStore;
pub use vars::LocalVars;
