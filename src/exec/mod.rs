// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the runtime talks to,
//!   so tests can swap in an executor that runs jobs inline.
//! - [`pool`] runs jobs on Tokio's blocking thread pool and reports back to
//!   the runtime via `RuntimeEvent`s.

pub mod backend;
pub mod pool;

pub use backend::ExecutorBackend;
pub use pool::PoolExecutor;
