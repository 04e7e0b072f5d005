// src/logging.rs

//! `tracing` setup for the `pipetree` binary.
//!
//! The level comes from `--log-level`, then `PIPETREE_LOG`, then `info`.
//! Output goes to stderr; pool threads are named so interleaved task logs
//! stay attributable.

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "PIPETREE_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_level = std::env::var(LOG_ENV_VAR).ok();
    let level = resolve_level(cli_level, env_level.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

fn resolve_level(cli_level: Option<LogLevel>, env_level: Option<&str>) -> Level {
    match cli_level {
        Some(lvl) => lvl.into(),
        None => env_level.and_then(parse_level_str).unwrap_or(Level::INFO),
    }
}

impl From<LogLevel> for Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_wins_over_env() {
        assert_eq!(resolve_level(Some(LogLevel::Trace), Some("error")), Level::TRACE);
    }

    #[test]
    fn env_level_is_case_insensitive() {
        assert_eq!(resolve_level(None, Some(" Warning ")), Level::WARN);
    }

    #[test]
    fn unknown_env_level_falls_back_to_info() {
        assert_eq!(resolve_level(None, Some("loud")), Level::INFO);
        assert_eq!(resolve_level(None, None), Level::INFO);
    }
}
