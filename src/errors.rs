// src/errors.rs

//! Crate-wide error types.
//!
//! [`PipelineError`] is what the scheduler propagates; anything it returns
//! aborts the run. Task-level "not ready yet" is not an error at all, it is
//! [`WorkOutcome::Repeat`](crate::worker::WorkOutcome::Repeat).

use thiserror::Error;

use crate::tree::WorkerStatus;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Node '{parent}' already has a child named '{name}'")]
    DuplicateSibling { parent: String, name: String },

    #[error("{kind} was already used as a dependency and cannot be extended")]
    SegmentLocked { kind: &'static str },

    #[error("Group already has members; its dependency set is fixed")]
    GroupAlreadyAssigned,

    #[error("Unknown node #{0}")]
    UnknownNode(usize),

    #[error("Node {node} cannot depend on {dependency}: {reason}")]
    InvalidDependency {
        node: String,
        dependency: String,
        reason: &'static str,
    },

    #[error("Cycle detected in work graph: {0}")]
    DependencyCycle(String),

    #[error("Blueprint '{0}' is registered twice")]
    DuplicateBlueprint(String),

    #[error("Unknown blueprint '{0}'")]
    UnknownBlueprint(String),

    #[error("Blueprint '{name}' builds {actual}, not {expected}")]
    BlueprintTypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Blueprint '{0}' does not allow multiple instances")]
    BlueprintReinstantiated(String),

    #[error("Invalid status transition for {node}: {from} -> {to}")]
    InvalidTransition {
        node: String,
        from: WorkerStatus,
        to: WorkerStatus,
    },

    #[error("Parameter {0} does not exist and has no default")]
    ParameterMissing(String),

    #[error("Parameter {path} has an unexpected type: {source}")]
    ParameterType {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A structural error raised while working on a specific node.
    #[error("{path}: {source}")]
    Node {
        path: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Work failed at {path}: {cause:#}")]
    WorkFailed { path: String, cause: anyhow::Error },

    #[error("Worker for {path} was lost: {message}")]
    WorkerLost { path: String, message: String },

    #[error("Scheduler stalled after {scans} scans without progress ({rejected} task(s) keep rejecting)")]
    Stalled { scans: usize, rejected: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Attach the global path of the node the error was raised on.
    pub fn at(self, path: impl Into<String>) -> Self {
        match self {
            err @ (PipelineError::Node { .. } | PipelineError::WorkFailed { .. }) => err,
            other => PipelineError::Node {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping node annotations.
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            PipelineError::Node { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Errors surfaced by cache backends and access guards.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache {location} has no value and nothing to pull from")]
    NoValue { location: String },

    #[error("Cache {location} lock was poisoned by a panicking worker")]
    Poisoned { location: String },

    #[error("Cache IO failed for {path}: {cause:#}")]
    Io { path: String, cause: anyhow::Error },

    #[error("Cache {path} holds malformed JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
