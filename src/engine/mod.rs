// src/engine/mod.rs

//! Orchestration engine for pipetree.
//!
//! The pure scheduler state machine lives in [`core`]: it scans the work
//! tree, expands dispatchers, and hands out [`Job`]s. The async shell in
//! [`runtime`] feeds it completions from an executor backend. Nothing in
//! `core` touches Tokio or channels, so it can be driven directly in tests.

pub mod core;
pub mod log;
pub mod postprocess;
pub mod runtime;

use std::fmt;

use crate::tree::NodeId;

pub use core::{Completion, Job, RunReport, ScanStep, Scheduler, SchedulerOptions, execute};
pub use log::RuntimeLog;
pub use postprocess::{PostprocessOptions, postprocess};
pub use runtime::{Runtime, RuntimeOptions};

/// Events flowing into the runtime from the executor.
pub enum RuntimeEvent {
    /// A task body returned (successfully, with a rejection, or an error).
    TaskCompleted(Completion),
    /// The thread running a task went away without reporting (panic).
    WorkerLost { node: NodeId, message: String },
}

impl fmt::Debug for RuntimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeEvent::TaskCompleted(c) => f
                .debug_struct("TaskCompleted")
                .field("node", &c.node)
                .field("ok", &c.outcome.is_ok())
                .finish(),
            RuntimeEvent::WorkerLost { node, message } => f
                .debug_struct("WorkerLost")
                .field("node", node)
                .field("message", message)
                .finish(),
        }
    }
}
