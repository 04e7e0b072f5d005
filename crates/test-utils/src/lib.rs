pub mod builders;
pub mod fake_executor;

use std::sync::{Arc, Once};

use pipetree::fs::MockFileSystem;
use pipetree::params::ParameterRegistry;
use pipetree::types::ExecutionMode;
use pipetree::worker::RunContext;
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A run context over an empty in-memory filesystem and no parameters.
pub fn test_context(mode: ExecutionMode) -> Arc<RunContext> {
    test_context_with(mode, Value::Object(Default::default()))
}

/// Like [`test_context`], with a parameter document.
pub fn test_context_with(mode: ExecutionMode, parameters: Value) -> Arc<RunContext> {
    Arc::new(RunContext::new(
        mode,
        ParameterRegistry::new(parameters),
        Arc::new(MockFileSystem::new()),
    ))
}
