// tests/config_loading.rs

use std::io::Write;

use pipetree::config::{RunConfig, load_and_validate, load_from_path, validate_config};
use pipetree::errors::PipelineError;
use pipetree::types::SkipPolicy;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn full_config_is_loaded() {
    let file = write_config(
        r#"
        [runtime]
        threads = 4
        request_skipping = true
        skip_policy = "scheduler"
        retry_interval_ms = 25

        [filesystem]
        input = "data/in"
        output = "data/out"

        [parameters]
        path = "parameters.json"
        "#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.runtime.threads, 4);
    assert!(cfg.runtime.request_skipping);
    assert_eq!(cfg.runtime.skip_policy, SkipPolicy::Scheduler);
    assert_eq!(cfg.runtime.retry_interval().as_millis(), 25);
    assert_eq!(cfg.runtime.max_stalled_scans, 10_000);
    assert_eq!(cfg.filesystem.input.as_deref(), Some(std::path::Path::new("data/in")));
}

#[test]
fn empty_config_uses_defaults() {
    let file = write_config("");
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.runtime.threads, 1);
    assert_eq!(cfg.runtime.skip_policy, SkipPolicy::Advisory);
    assert!(cfg.filesystem.input.is_none());
}

#[test]
fn zero_threads_is_rejected() {
    let file = write_config("[runtime]\nthreads = 0\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)), "{err}");
}

#[test]
fn unknown_keys_are_rejected() {
    let file = write_config("[runtime]\nthreadz = 2\n");
    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, PipelineError::TomlError(_)), "{err}");
}

#[test]
fn overrides_are_revalidated() {
    let mut cfg = RunConfig::default();
    cfg.filesystem.input = Some("same".into());
    cfg.filesystem.output = Some("same".into());
    assert!(validate_config(&cfg).is_err());
}
