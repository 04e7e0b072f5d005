// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawConfigFile, RunConfig};
use crate::errors::Result;

/// Read and deserialize a config file without semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Read, deserialize and validate. The normal entry point.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<RunConfig> {
    let raw = load_from_path(&path)?;
    RunConfig::try_from(raw)
}

/// Resolve the configuration the binary should use.
///
/// An explicit path must exist. Without one, `Pipetree.toml` is read when
/// present and defaults are used otherwise.
pub fn load_or_default(explicit: Option<&Path>) -> Result<RunConfig> {
    match explicit {
        Some(path) => load_and_validate(path),
        None => {
            let fallback = default_config_path();
            if fallback.is_file() {
                load_and_validate(&fallback)
            } else {
                debug!(path = %fallback.display(), "no config file; using defaults");
                Ok(RunConfig::default())
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("Pipetree.toml")
}
