// src/config/mod.rs

//! Run configuration for pipetree.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: turning the raw model into a checked [`RunConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{FilesystemSection, ParametersSection, RawConfigFile, RunConfig, RuntimeSection};
pub use validate::validate_config;
