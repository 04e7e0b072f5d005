// tests/parameters.rs

use std::sync::Arc;

use serde_json::json;

use pipetree::errors::PipelineError;
use pipetree::params::{ParameterBuilder, ParameterRegistry};
use pipetree::tree::NodePath;
use pipetree::types::ExecutionMode;

fn path(p: &str) -> NodePath {
    NodePath::new(p.split('/').map(String::from).collect())
}

fn builder(values: serde_json::Value, mode: ExecutionMode) -> ParameterBuilder {
    ParameterBuilder::new(
        Arc::new(ParameterRegistry::new(values)),
        mode,
        path("algorithm/ingest"),
        path("samples/a"),
    )
}

#[test]
fn stored_values_win_over_defaults() {
    let mut params = builder(
        json!({ "algorithm": { "ingest": { "threshold": 0.5 } } }),
        ExecutionMode::Run,
    );
    let threshold = params.algorithm_parameter("threshold", 0.1_f64).unwrap();
    assert_eq!(threshold.query(params.registry(), ExecutionMode::Run).unwrap(), 0.5);
}

#[test]
fn declared_default_fills_missing_values() {
    let mut params = builder(json!({}), ExecutionMode::Run);
    let window = params.algorithm_parameter("window", 7_u32).unwrap();
    assert_eq!(window.query(params.registry(), ExecutionMode::Run).unwrap(), 7);

    // `null` counts as absent.
    let mut params = builder(
        json!({ "algorithm": { "ingest": { "window": null } } }),
        ExecutionMode::Run,
    );
    let window = params.algorithm_parameter("window", 7_u32).unwrap();
    assert_eq!(window.query(params.registry(), ExecutionMode::Run).unwrap(), 7);
}

#[test]
fn required_parameters_fail_only_outside_simulation() {
    let mut params = builder(json!({}), ExecutionMode::Run);
    let label = params.required_sample_parameter::<String>("label").unwrap();

    let err = label.query(params.registry(), ExecutionMode::Run).unwrap_err();
    match err {
        PipelineError::ParameterMissing(p) => assert_eq!(p, "samples / a / label"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        label.query(params.registry(), ExecutionMode::Simulate).unwrap(),
        String::new()
    );
}

#[test]
fn required_algorithm_parameters_are_marked_in_the_schema() {
    let mut params = builder(json!({ "algorithm": { "ingest": { "method": "otsu" } } }), ExecutionMode::Run);
    let method = params.required_algorithm_parameter::<String>("method").unwrap();

    assert_eq!(method.query(params.registry(), ExecutionMode::Run).unwrap(), "otsu");
    let schema = params.registry().schema_json();
    let ingest = &schema["properties"]["algorithm"]["properties"]["ingest"];
    assert_eq!(ingest["required"], json!(["method"]));
    assert_eq!(ingest["properties"]["method"]["type"], "string");
}

#[test]
fn wrong_types_are_reported_with_the_path() {
    let mut params = builder(
        json!({ "runtime": { "retries": "three" } }),
        ExecutionMode::Run,
    );
    let retries = params.runtime_parameter("retries", 1_u32).unwrap();
    let err = retries.query(params.registry(), ExecutionMode::Run).unwrap_err();
    assert!(
        matches!(&err, PipelineError::ParameterType { path, .. } if path == "runtime/retries"),
        "{err}"
    );
}

#[test]
fn effective_values_include_defaults() {
    let mut params = builder(json!({ "samples": { "a": { "label": "x" } } }), ExecutionMode::Run);
    params.algorithm_parameter("threshold", 0.25_f64).unwrap();
    params.sample_parameter("label", String::from("unnamed")).unwrap();

    let effective = params.registry().effective_values();
    assert_eq!(effective["algorithm"]["ingest"]["threshold"], 0.25);
    assert_eq!(effective["samples"]["a"]["label"], "x");
}
