// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::SkipPolicy;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [runtime]
/// threads = 4
/// request_skipping = true
/// skip_policy = "scheduler"
///
/// [filesystem]
/// input = "data/in"
/// output = "data/out"
///
/// [parameters]
/// path = "parameters.json"
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub filesystem: FilesystemSection,

    #[serde(default)]
    pub parameters: ParametersSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub runtime: RuntimeSection,
    pub filesystem: FilesystemSection,
    pub parameters: ParametersSection,
}

impl RunConfig {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            runtime: raw.runtime,
            filesystem: raw.filesystem,
            parameters: raw.parameters,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Size of the worker pool. `1` runs tasks one after another.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Hint that work with already-present outputs may be skipped.
    #[serde(default)]
    pub request_skipping: bool,

    #[serde(default)]
    pub skip_policy: SkipPolicy,

    #[serde(default)]
    pub full_runtime_log: bool,

    #[serde(default)]
    pub write_worker_graph: bool,

    /// Back-off before re-scanning when only rejected tasks remain.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Consecutive scans without progress before giving up. `0` disables.
    #[serde(default = "default_max_stalled_scans")]
    pub max_stalled_scans: usize,
}

fn default_threads() -> usize {
    1
}

fn default_retry_interval_ms() -> u64 {
    10
}

fn default_max_stalled_scans() -> usize {
    10_000
}

impl RuntimeSection {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            request_skipping: false,
            skip_policy: SkipPolicy::default(),
            full_runtime_log: false,
            write_worker_graph: false,
            retry_interval_ms: default_retry_interval_ms(),
            max_stalled_scans: default_max_stalled_scans(),
        }
    }
}

/// `[filesystem]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesystemSection {
    /// One sub-directory per sample.
    #[serde(default)]
    pub input: Option<PathBuf>,

    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// `[parameters]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParametersSection {
    /// JSON parameter document. Without one, every parameter falls back to
    /// its declared default.
    #[serde(default)]
    pub path: Option<PathBuf>,
}
