// src/tree/mod.rs

//! The work tree.
//!
//! Nodes live in an append-only arena ([`WorkTree`]) and refer to each other
//! by [`NodeId`]. Parents are stored as ids, so there are no ownership
//! cycles and no dangling parents: nothing is removed for the life of a run.
//!
//! - [`status`]: the worker status state machine.
//! - [`path`]: global / sample / algorithm path views.
//! - [`node`]: nodes, the arena and the status journal.
//! - [`segment`]: `Chain` and `Group` dependency wiring.
//! - [`graph`]: acyclicity checks and Graphviz export via `petgraph`.

pub mod graph;
pub mod node;
pub mod path;
pub mod segment;
pub mod status;

pub use node::{NodeId, Transition, WorkNode, WorkTree};
pub use path::NodePath;
pub use segment::{Chain, DependencySegment, Group, InsertSegment};
pub use status::WorkerStatus;
