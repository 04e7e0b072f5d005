// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod params;
pub mod pipelines;
pub mod tree;
pub mod types;
pub mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{RunConfig, RuntimeSection, load_or_default, validate_config};
use crate::engine::{
    PostprocessOptions, RunReport, Runtime, RuntimeEvent, RuntimeOptions, Scheduler,
    SchedulerOptions, postprocess,
};
use crate::errors::PipelineError;
use crate::exec::PoolExecutor;
use crate::fs::{DirectoriesImporter, FileSystem, ModuleFilesystem, RealFileSystem};
use crate::params::ParameterRegistry;
use crate::pipelines::{SummaryDispatcher, SummaryModule};
use crate::tree::WorkTree;
use crate::types::ExecutionMode;
use crate::worker::{RunContext, SampleRoot, Worker};

/// Name of the root node of the work tree.
pub const ROOT_NAME: &str = "pipetree";

/// Output directory used when neither the config nor the CLI names one.
pub const DEFAULT_OUTPUT_DIR: &str = "pipetree-output";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - parameter document, run context and module filesystem
/// - scheduler, runtime and pool executor
/// - post-processing or the parameter schema dump
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(args.config.as_deref())?;
    apply_overrides(&mut cfg, &args);

    let mode = if args.simulate || args.write_parameter_schema.is_some() {
        ExecutionMode::Simulate
    } else {
        ExecutionMode::Run
    };
    if args.write_parameter_schema.is_some() {
        cfg.runtime.threads = 1;
    }
    validate_config(&cfg)?;

    if args.dry_run {
        print_dry_run(&cfg, mode);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let outcome = run_pipeline(&cfg, mode, Arc::clone(&fs)).await?;

    if let Some(path) = &args.write_parameter_schema {
        let schema = serde_json::to_vec_pretty(&outcome.context.parameters().schema_json())?;
        fs.write(path, &schema)?;
        info!(path = %path.display(), "wrote parameter schema");
    }

    info!(
        nodes = outcome.report.tree.node_count(),
        artifacts = outcome.artifacts.len(),
        "pipetree run complete"
    );
    Ok(())
}

/// Everything a finished pipeline run leaves behind.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub context: Arc<RunContext>,
    pub artifacts: Vec<PathBuf>,
}

/// Run the built-in summary pipeline against `fs`.
pub async fn run_pipeline(
    cfg: &RunConfig,
    mode: ExecutionMode,
    fs: Arc<dyn FileSystem>,
) -> errors::Result<RunOutcome> {
    let parameters = match &cfg.parameters.path {
        Some(path) => ParameterRegistry::load(fs.as_ref(), path)?,
        None => ParameterRegistry::default(),
    };
    let ctx = Arc::new(
        RunContext::new(mode, parameters, Arc::clone(&fs))
            .with_skipping(cfg.runtime.request_skipping, cfg.runtime.skip_policy),
    );

    let filesystem = module_filesystem(cfg, mode, fs.as_ref())?;
    let root = SampleRoot::new(
        Arc::clone(&ctx),
        filesystem.clone(),
        SummaryModule::new,
        SummaryDispatcher::new,
    );
    let tree = WorkTree::new(ROOT_NAME, Worker::dispatcher(root));

    let report = run_tree(tree, Arc::clone(&ctx), &cfg.runtime).await?;

    let artifacts = if mode.is_simulating() {
        Vec::new()
    } else {
        postprocess(
            &report,
            &ctx,
            &filesystem.exported,
            PostprocessOptions {
                write_worker_graph: cfg.runtime.write_worker_graph,
            },
        )?
    };

    Ok(RunOutcome {
        report,
        context: ctx,
        artifacts,
    })
}

/// Schedule an already rooted tree to completion on the blocking pool.
pub async fn run_tree(
    tree: WorkTree,
    ctx: Arc<RunContext>,
    runtime: &RuntimeSection,
) -> errors::Result<RunReport> {
    let scheduler = Scheduler::new(
        tree,
        ctx,
        SchedulerOptions {
            threads: runtime.threads,
            max_stalled_scans: runtime.max_stalled_scans,
            full_runtime_log: runtime.full_runtime_log,
        },
    );

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = PoolExecutor::new(rt_tx);
    let options = RuntimeOptions {
        retry_interval: runtime.retry_interval(),
    };

    Runtime::new(scheduler, rt_rx, executor, options).run().await
}

fn module_filesystem(
    cfg: &RunConfig,
    mode: ExecutionMode,
    fs: &dyn FileSystem,
) -> errors::Result<ModuleFilesystem> {
    if mode.is_simulating() {
        return Ok(ModuleFilesystem::unbound());
    }
    let input = cfg.filesystem.input.clone().ok_or_else(|| {
        PipelineError::ConfigError(
            "an input directory is required unless simulating ([filesystem].input or --input)"
                .to_string(),
        )
    })?;
    let output = cfg
        .filesystem
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    Ok(DirectoriesImporter::new(input, output).import(fs)?)
}

fn apply_overrides(cfg: &mut RunConfig, args: &CliArgs) {
    if let Some(path) = &args.parameters {
        cfg.parameters.path = Some(path.clone());
    }
    if let Some(input) = &args.input {
        cfg.filesystem.input = Some(input.clone());
    }
    if let Some(output) = &args.output {
        cfg.filesystem.output = Some(output.clone());
    }
    if let Some(threads) = args.threads {
        cfg.runtime.threads = threads;
    }
    cfg.runtime.request_skipping |= args.skip;
    if let Some(policy) = args.skip_policy {
        cfg.runtime.skip_policy = policy;
    }
    cfg.runtime.write_worker_graph |= args.write_worker_graph;
    cfg.runtime.full_runtime_log |= args.full_runtime_log;
}

/// Simple dry-run output: print the resolved configuration.
fn print_dry_run(cfg: &RunConfig, mode: ExecutionMode) {
    println!("pipetree dry-run");
    println!("  mode = {mode}");
    println!("  runtime.threads = {}", cfg.runtime.threads);
    println!("  runtime.request_skipping = {}", cfg.runtime.request_skipping);
    println!("  runtime.skip_policy = {:?}", cfg.runtime.skip_policy);
    println!("  runtime.retry_interval_ms = {}", cfg.runtime.retry_interval_ms);
    println!("  runtime.max_stalled_scans = {}", cfg.runtime.max_stalled_scans);
    println!();

    let show = |p: &Option<PathBuf>| match p {
        Some(p) => p.display().to_string(),
        None => "(unset)".to_string(),
    };
    println!("filesystem:");
    println!("  input: {}", show(&cfg.filesystem.input));
    println!("  output: {}", show(&cfg.filesystem.output));
    println!("parameters:");
    println!("  path: {}", show(&cfg.parameters.path));

    debug!("dry-run complete (no execution)");
}
