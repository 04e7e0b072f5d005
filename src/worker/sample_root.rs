// src/worker/sample_root.rs

//! The dispatcher at the top of a pipeline: one child per sample.
//!
//! Each sample gets its own module interface, set up on the sample's
//! subsystem before any of the sample's workers are prepared. Nodes
//! directly below a sample root see themselves under `samples/<name>`.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::fs::ModuleFilesystem;
use crate::params::ParameterBuilder;

use super::blueprint::{Blueprint, BlueprintList, Builder};
use super::context::RunContext;
use super::dispatcher::Dispatcher;
use super::module::ModuleInterface;

/// Name of the single placeholder sample used when simulating.
pub const SIMULATED_SAMPLE: &str = "__OBJECT__";

const SAMPLES_KEY: &str = "samples";

type ModuleFactory<M> = Arc<dyn Fn(ModuleFilesystem) -> M + Send + Sync>;
type SampleFactory<M, D> = Arc<dyn Fn(Arc<M>) -> D + Send + Sync>;

pub struct SampleRoot<M, D> {
    ctx: Arc<RunContext>,
    filesystem: ModuleFilesystem,
    make_module: ModuleFactory<M>,
    make_sample: SampleFactory<M, D>,
    _sample: PhantomData<fn() -> D>,
}

impl<M, D> SampleRoot<M, D>
where
    M: ModuleInterface,
    D: Dispatcher,
{
    pub fn new(
        ctx: Arc<RunContext>,
        filesystem: ModuleFilesystem,
        make_module: impl Fn(ModuleFilesystem) -> M + Send + Sync + 'static,
        make_sample: impl Fn(Arc<M>) -> D + Send + Sync + 'static,
    ) -> Self {
        Self {
            ctx,
            filesystem,
            make_module: Arc::new(make_module),
            make_sample: Arc::new(make_sample),
            _sample: PhantomData,
        }
    }

    /// The samples this run will process.
    ///
    /// Listed by the `samples` object of the parameter document when it has
    /// one, else discovered from the imported directory. Samples without a
    /// directory on disk are skipped.
    pub fn sample_names(&self) -> Result<Vec<String>> {
        if self.ctx.is_simulating() {
            return Ok(vec![SIMULATED_SAMPLE.to_string()]);
        }

        let listed = self
            .ctx
            .parameters()
            .value_at(&[SAMPLES_KEY.to_string()])
            .and_then(|v| v.as_object())
            .map(|samples| samples.keys().cloned().collect::<Vec<_>>());
        let candidates = match listed {
            Some(names) => names,
            None => self
                .filesystem
                .imported
                .children()
                .map(|entry| entry.name().to_string())
                .collect(),
        };

        let mut names = Vec::with_capacity(candidates.len());
        for name in candidates {
            if name == SIMULATED_SAMPLE {
                return Err(PipelineError::ConfigError(format!(
                    "'{SIMULATED_SAMPLE}' is reserved and cannot be used as a sample name"
                )));
            }
            let entry = self.filesystem.imported.resolve(&name);
            match entry.external_path() {
                Some(path) if self.ctx.fs().is_dir(path) => names.push(name),
                Some(path) => warn!(sample = %name, ?path, "sample directory not found; skipping"),
                None => warn!(sample = %name, "sample has no external path; skipping"),
            }
        }
        Ok(names)
    }
}

impl<M, D> Dispatcher for SampleRoot<M, D>
where
    M: ModuleInterface,
    D: Dispatcher,
{
    fn create_blueprints(
        &mut self,
        blueprints: &mut BlueprintList,
        _params: &mut ParameterBuilder,
    ) -> Result<()> {
        let names = self.sample_names()?;
        info!(samples = names.len(), "registering samples");

        for name in names {
            let mut module = (self.make_module)(self.filesystem.subsystem(&name));
            module.setup(&self.ctx).map_err(|cause| PipelineError::WorkFailed {
                path: format!("{SAMPLES_KEY}/{name}"),
                cause,
            })?;
            debug!(sample = %name, "module set up");

            let module = Arc::new(module);
            let make_sample = Arc::clone(&self.make_sample);
            blueprints.add(Blueprint::dispatcher(name, move || {
                make_sample(Arc::clone(&module))
            }))?;
        }
        Ok(())
    }

    fn build(&mut self, builder: &mut Builder<'_>) -> Result<()> {
        builder.dispatch_all()?;
        Ok(())
    }

    fn is_sample_root(&self) -> bool {
        true
    }
}
