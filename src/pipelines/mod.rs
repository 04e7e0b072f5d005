// src/pipelines/mod.rs

//! Pipelines shipped with the binary.

pub mod summary;

pub use summary::{Summary, SummaryDispatcher, SummaryModule};
