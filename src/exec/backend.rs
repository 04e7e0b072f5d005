// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime hands every scan's jobs to an `ExecutorBackend`. The backend
//! decides where they run and must eventually answer each job with exactly
//! one `RuntimeEvent` (a completion, or `WorkerLost`).

use std::future::Future;
use std::pin::Pin;

use crate::engine::Job;
use crate::errors::Result;

pub trait ExecutorBackend: Send {
    /// Start the given jobs. Completions are reported asynchronously.
    fn spawn_jobs(
        &mut self,
        jobs: Vec<Job>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
