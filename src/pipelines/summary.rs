// src/pipelines/summary.rs

//! Per-sample summary statistics.
//!
//! Each sample directory holds a `values.json` array of numbers. The
//! pipeline chains three stages per sample:
//!
//! 1. `ingest`: drop non-finite values;
//! 2. a transform chosen by the `transform` parameter (`scale` by a
//!    `factor`, or min-max `normalize`);
//! 3. `export`: write `summary.json` to the sample's exported directory.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{Cache, JsonFileCache, Location, MemoryCache};
use crate::errors::{PipelineError, Result};
use crate::fs::ModuleFilesystem;
use crate::params::{Parameter, ParameterBuilder};
use crate::tree::Chain;
use crate::worker::{
    Blueprint, BlueprintList, Builder, Dispatcher, ModuleInterface, RunContext, Task,
    TaskContext, WorkOutcome,
};

pub const VALUES_FILE: &str = "values.json";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let sum: f64 = values.iter().sum();
        Self {
            count: values.len(),
            mean: sum / values.len() as f64,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

type Series = Arc<Cache<MemoryCache<Vec<f64>>>>;

#[derive(Debug)]
struct SummaryCaches {
    input: Arc<Cache<JsonFileCache<Vec<f64>>>>,
    cleaned: Series,
    transformed: Series,
    summary: Arc<Cache<JsonFileCache<Summary>>>,
}

/// Caches of one sample.
#[derive(Debug)]
pub struct SummaryModule {
    filesystem: ModuleFilesystem,
    caches: Option<SummaryCaches>,
}

impl SummaryModule {
    pub fn new(filesystem: ModuleFilesystem) -> Self {
        Self {
            filesystem,
            caches: None,
        }
    }

    fn caches(&self) -> anyhow::Result<&SummaryCaches> {
        self.caches
            .as_ref()
            .ok_or_else(|| anyhow!("summary module used before setup"))
    }
}

impl ModuleInterface for SummaryModule {
    fn filesystem(&self) -> &ModuleFilesystem {
        &self.filesystem
    }

    fn setup(&mut self, ctx: &RunContext) -> anyhow::Result<()> {
        let registry = ctx.caches();
        let fs = Arc::clone(ctx.fs());

        let values = self.filesystem.imported.resolve(VALUES_FILE);
        let input = registry.register(
            JsonFileCache::new(Arc::clone(&fs), values.external_path().map(Path::to_path_buf)),
            Location::from(&values),
        );

        let exported = &self.filesystem.exported;
        let series = |name: &str| -> Series {
            registry.register(
                MemoryCache::new(),
                Location::in_memory(exported.internal_path().join(name)),
            )
        };
        let cleaned = series("cleaned");
        let transformed = series("transformed");

        let summary_entry = exported.resolve(SUMMARY_FILE);
        let summary = registry.register(
            JsonFileCache::new(fs, summary_entry.external_path().map(Path::to_path_buf)),
            Location::from(&summary_entry),
        );

        self.caches = Some(SummaryCaches {
            input,
            cleaned,
            transformed,
            summary,
        });
        Ok(())
    }
}

/// Builds one sample's chain.
pub struct SummaryDispatcher {
    module: Arc<SummaryModule>,
    transform: Option<Parameter<String>>,
}

impl SummaryDispatcher {
    pub fn new(module: Arc<SummaryModule>) -> Self {
        Self {
            module,
            transform: None,
        }
    }
}

impl Dispatcher for SummaryDispatcher {
    fn create_blueprints(
        &mut self,
        blueprints: &mut BlueprintList,
        params: &mut ParameterBuilder,
    ) -> Result<()> {
        let module = &self.module;
        blueprints.add(Blueprint::task("ingest", {
            let module = Arc::clone(module);
            move || IngestTask::new(Arc::clone(&module))
        }))?;
        blueprints.add(Blueprint::task("scale", {
            let module = Arc::clone(module);
            move || ScaleTask::new(Arc::clone(&module))
        }))?;
        blueprints.add(Blueprint::task("normalize", {
            let module = Arc::clone(module);
            move || NormalizeTask::new(Arc::clone(&module))
        }))?;
        blueprints.add(Blueprint::task("export", {
            let module = Arc::clone(module);
            move || ExportTask::new(Arc::clone(&module))
        }))?;

        self.transform = Some(params.blueprint_choice("transform", blueprints, Some("scale"))?);
        Ok(())
    }

    fn build(&mut self, builder: &mut Builder<'_>) -> Result<()> {
        let choice = match &self.transform {
            Some(param) => builder.context().query(param)?,
            None => "scale".to_string(),
        };

        let mut chain = Chain::new(&[]);
        builder.build_in::<IngestTask>("ingest", &mut chain)?;
        match choice.as_str() {
            "scale" => builder.build_in::<ScaleTask>("scale", &mut chain)?,
            "normalize" => builder.build_in::<NormalizeTask>("normalize", &mut chain)?,
            other => {
                return Err(PipelineError::ConfigError(format!(
                    "unknown transform '{other}' (expected \"scale\" or \"normalize\")"
                )));
            }
        };
        builder.build_in::<ExportTask>("export", &mut chain)?;
        Ok(())
    }
}

pub struct IngestTask {
    module: Arc<SummaryModule>,
}

impl IngestTask {
    fn new(module: Arc<SummaryModule>) -> Self {
        Self { module }
    }
}

impl Task for IngestTask {
    fn run(&mut self, ctx: &TaskContext) -> anyhow::Result<WorkOutcome> {
        let caches = self.module.caches()?;
        let values: Vec<f64> = {
            let input = caches
                .input
                .read(ctx.mode())
                .with_context(|| format!("reading {VALUES_FILE}"))?;
            input.get().iter().copied().filter(|v| v.is_finite()).collect()
        };
        debug!(node = %ctx.global_path(), count = values.len(), "ingested values");

        let mut cleaned = caches.cleaned.write()?;
        cleaned.set(values);
        cleaned.finish()?;
        Ok(WorkOutcome::Done)
    }
}

/// Reads the cleaned series or asks to be retried when it is not there yet.
fn cleaned_series(module: &SummaryModule, ctx: &TaskContext) -> anyhow::Result<Option<Vec<f64>>> {
    let caches = module.caches()?;
    if !caches.cleaned.is_available()? {
        debug!(node = %ctx.global_path(), "cleaned series not available yet");
        return Ok(None);
    }
    let cleaned = caches.cleaned.read(ctx.mode())?;
    Ok(Some(cleaned.get().clone()))
}

fn store_transformed(module: &SummaryModule, values: Vec<f64>) -> anyhow::Result<()> {
    let mut transformed = module.caches()?.transformed.write()?;
    transformed.set(values);
    transformed.finish()?;
    Ok(())
}

pub struct ScaleTask {
    module: Arc<SummaryModule>,
    factor: Option<Parameter<f64>>,
}

impl ScaleTask {
    fn new(module: Arc<SummaryModule>) -> Self {
        Self {
            module,
            factor: None,
        }
    }
}

impl Task for ScaleTask {
    fn create_parameters(&mut self, params: &mut ParameterBuilder) -> Result<()> {
        let factor = params.algorithm_parameter("factor", 1.0_f64)?;
        params
            .registry()
            .register_parameter(factor.path())
            .node()
            .document_title("Scale factor")
            .document_description("Every value is multiplied by this factor");
        self.factor = Some(factor);
        Ok(())
    }

    fn run(&mut self, ctx: &TaskContext) -> anyhow::Result<WorkOutcome> {
        let Some(values) = cleaned_series(&self.module, ctx)? else {
            return Ok(WorkOutcome::Repeat);
        };
        let factor = match &self.factor {
            Some(param) => ctx.query(param)?,
            None => 1.0,
        };
        store_transformed(&self.module, values.into_iter().map(|v| v * factor).collect())?;
        Ok(WorkOutcome::Done)
    }
}

pub struct NormalizeTask {
    module: Arc<SummaryModule>,
}

impl NormalizeTask {
    fn new(module: Arc<SummaryModule>) -> Self {
        Self { module }
    }
}

impl Task for NormalizeTask {
    fn run(&mut self, ctx: &TaskContext) -> anyhow::Result<WorkOutcome> {
        let Some(values) = cleaned_series(&self.module, ctx)? else {
            return Ok(WorkOutcome::Repeat);
        };
        let Summary { min, max, .. } = Summary::of(&values);
        let span = max - min;
        let normalized = values
            .into_iter()
            .map(|v| if span > 0.0 { (v - min) / span } else { 0.0 })
            .collect();
        store_transformed(&self.module, normalized)?;
        Ok(WorkOutcome::Done)
    }
}

pub struct ExportTask {
    module: Arc<SummaryModule>,
}

impl ExportTask {
    fn new(module: Arc<SummaryModule>) -> Self {
        Self { module }
    }
}

impl Task for ExportTask {
    fn run(&mut self, ctx: &TaskContext) -> anyhow::Result<WorkOutcome> {
        if ctx.request_skipping() && self.outputs_present(ctx) {
            info!(node = %ctx.global_path(), "summary already exported; skipping");
            return Ok(WorkOutcome::Done);
        }

        let caches = self.module.caches()?;
        let summary = {
            let transformed = caches.transformed.read(ctx.mode())?;
            Summary::of(transformed.get())
        };
        info!(node = %ctx.global_path(), count = summary.count, mean = summary.mean, "exporting summary");

        let mut output = caches.summary.write()?;
        output.set(summary);
        output.finish()?;
        Ok(WorkOutcome::Done)
    }

    fn outputs_present(&self, ctx: &TaskContext) -> bool {
        self.module
            .caches()
            .ok()
            .and_then(|c| c.summary.location().external_path().map(|p| ctx.fs().is_file(p)))
            .unwrap_or(false)
    }
}
