// src/engine/postprocess.rs

//! End-of-run artifacts.
//!
//! After a real run: flush every registered cache, then write the effective
//! parameter document, the runtime log and (optionally) the worker graph
//! into the exported root.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::errors::Result;
use crate::fs::FsEntry;
use crate::tree::graph::to_dot;
use crate::worker::RunContext;

use super::core::RunReport;

pub const PARAMETERS_FILE: &str = "parameters.json";
pub const RUNTIME_LOG_FILE: &str = "runtime-log.json";
pub const WORKER_GRAPH_FILE: &str = "workers.dot";

#[derive(Debug, Clone, Copy, Default)]
pub struct PostprocessOptions {
    pub write_worker_graph: bool,
}

/// Returns the files written.
pub fn postprocess(
    report: &RunReport,
    ctx: &RunContext,
    exported: &FsEntry,
    options: PostprocessOptions,
) -> Result<Vec<PathBuf>> {
    let flushed = ctx.caches().postprocess_all()?;
    info!(caches = flushed, "caches post-processed");

    let Some(root) = exported.external_path() else {
        warn!("exported root has no location on disk; skipping run artifacts");
        return Ok(Vec::new());
    };

    let fs = ctx.fs();
    let mut written = Vec::new();

    let parameters = serde_json::to_vec_pretty(&ctx.parameters().effective_values())?;
    let path = root.join(PARAMETERS_FILE);
    fs.write(&path, &parameters)?;
    written.push(path);

    let log = serde_json::to_vec_pretty(&report.log.to_json())?;
    let path = root.join(RUNTIME_LOG_FILE);
    fs.write(&path, &log)?;
    written.push(path);

    if options.write_worker_graph {
        let dot = to_dot(&report.tree)?;
        let path = root.join(WORKER_GRAPH_FILE);
        fs.write(&path, dot.as_bytes())?;
        written.push(path);
    }

    for path in &written {
        info!(?path, "wrote run artifact");
    }
    Ok(written)
}
