// src/types.rs

//! Small value enums shared by config, CLI and engine.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How workers execute.
///
/// - `Run`: tasks do real work.
/// - `Simulate`: tasks only `dry_run`, dispatchers dispatch every blueprint
///   once. Used to discover the full parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Run,
    Simulate,
}

impl ExecutionMode {
    pub fn is_simulating(self) -> bool {
        self == ExecutionMode::Simulate
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Run
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Run => f.write_str("run"),
            ExecutionMode::Simulate => f.write_str("simulate"),
        }
    }
}

/// Who honours a skip request.
///
/// - `Advisory` (default): the scheduler only exposes the flag; each task
///   decides for itself whether its outputs are fresh.
/// - `Scheduler`: the scheduler marks a task done without running it when
///   skipping is requested and `Task::outputs_present` reports true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipPolicy {
    Advisory,
    Scheduler,
}

impl Default for SkipPolicy {
    fn default() -> Self {
        SkipPolicy::Advisory
    }
}

impl FromStr for SkipPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "advisory" => Ok(SkipPolicy::Advisory),
            "scheduler" => Ok(SkipPolicy::Scheduler),
            other => Err(format!(
                "invalid skip_policy: {other} (expected \"advisory\" or \"scheduler\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_policy_parses_case_insensitively() {
        assert_eq!(" Scheduler ".parse::<SkipPolicy>(), Ok(SkipPolicy::Scheduler));
        assert!("never".parse::<SkipPolicy>().is_err());
    }
}
