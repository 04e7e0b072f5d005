// src/config/validate.rs

use crate::config::model::{RawConfigFile, RunConfig};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawConfigFile> for RunConfig {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(RunConfig::new_unchecked(raw))
    }
}

/// Re-check an already built config, e.g. after CLI overrides were applied.
pub fn validate_config(cfg: &RunConfig) -> Result<()> {
    validate_runtime(cfg.runtime.threads)?;
    validate_directories(
        cfg.filesystem.input.as_deref(),
        cfg.filesystem.output.as_deref(),
    )
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_runtime(cfg.runtime.threads)?;
    validate_directories(
        cfg.filesystem.input.as_deref(),
        cfg.filesystem.output.as_deref(),
    )?;
    Ok(())
}

fn validate_runtime(threads: usize) -> Result<()> {
    if threads == 0 {
        return Err(PipelineError::ConfigError(
            "[runtime].threads must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_directories(
    input: Option<&std::path::Path>,
    output: Option<&std::path::Path>,
) -> Result<()> {
    if let (Some(input), Some(output)) = (input, output) {
        if input == output {
            return Err(PipelineError::ConfigError(format!(
                "[filesystem].input and [filesystem].output must differ (both are {:?})",
                input
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        let raw: RawConfigFile = toml::from_str("[runtime]\nthreads = 0\n").unwrap();
        let err = RunConfig::try_from(raw).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("threads")));
    }

    #[test]
    fn identical_directories_are_rejected() {
        let raw: RawConfigFile =
            toml::from_str("[filesystem]\ninput = \"data\"\noutput = \"data\"\n").unwrap();
        assert!(RunConfig::try_from(raw).is_err());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let raw: RawConfigFile = toml::from_str("").unwrap();
        let cfg = RunConfig::try_from(raw).unwrap();
        assert_eq!(cfg.runtime.threads, 1);
        assert_eq!(cfg.runtime.retry_interval_ms, 10);
        assert!(cfg.parameters.path.is_none());
    }
}
