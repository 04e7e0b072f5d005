// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::SkipPolicy;

/// Command-line arguments for `pipetree`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipetree",
    version,
    about = "Run a per-sample processing pipeline as a dependency-ordered work tree.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the run configuration (TOML).
    ///
    /// If omitted, `Pipetree.toml` is used when it exists, otherwise defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// JSON parameter document. Overrides `[parameters].path`.
    #[arg(long, value_name = "PATH")]
    pub parameters: Option<PathBuf>,

    /// Input directory (one sub-directory per sample). Overrides `[filesystem].input`.
    #[arg(long, value_name = "DIR")]
    pub input: Option<PathBuf>,

    /// Output directory. Overrides `[filesystem].output`.
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Number of worker threads. Overrides `[runtime].threads`.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Ask tasks to skip work whose outputs already exist.
    #[arg(long)]
    pub skip: bool,

    /// Who honours `--skip`: `advisory` (tasks) or `scheduler`.
    /// Overrides `[runtime].skip_policy`.
    #[arg(long, value_name = "POLICY")]
    pub skip_policy: Option<SkipPolicy>,

    /// Walk the whole tree without doing real work.
    #[arg(long)]
    pub simulate: bool,

    /// Write the parameter schema to PATH (implies `--simulate`).
    #[arg(long, value_name = "PATH")]
    pub write_parameter_schema: Option<PathBuf>,

    /// Write the work tree as a Graphviz file into the output directory.
    #[arg(long)]
    pub write_worker_graph: bool,

    /// Include every task's start/stop entry in the runtime log.
    #[arg(long)]
    pub full_runtime_log: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPETREE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved configuration, but don't run.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_flag_takes_a_path() {
        let args = CliArgs::parse_from([
            "pipetree",
            "--write-parameter-schema",
            "schema.json",
            "--threads",
            "3",
        ]);
        assert_eq!(args.write_parameter_schema, Some(PathBuf::from("schema.json")));
        assert_eq!(args.threads, Some(3));
        assert!(!args.simulate);
    }

    #[test]
    fn skip_policy_flag_is_parsed() {
        let args = CliArgs::parse_from(["pipetree", "--skip", "--skip-policy", "scheduler"]);
        assert!(args.skip);
        assert_eq!(args.skip_policy, Some(SkipPolicy::Scheduler));
    }
}
