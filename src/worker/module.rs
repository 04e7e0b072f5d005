// src/worker/module.rs

use crate::fs::ModuleFilesystem;

use super::context::RunContext;

/// Per-sample shared state that a sample's workers read and write against.
///
/// `setup` runs once, before any worker of the sample is prepared. It is
/// where cache slots are created (and registered with the run's cache
/// registry) from the module's filesystem.
pub trait ModuleInterface: Send + Sync + 'static {
    fn filesystem(&self) -> &ModuleFilesystem;

    fn setup(&mut self, ctx: &RunContext) -> anyhow::Result<()>;
}
