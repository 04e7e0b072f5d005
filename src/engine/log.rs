// src/engine/log.rs

//! Per-run timing log, written as `runtime-log.json`.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub node: String,
    pub thread: String,
    pub start_ms: f64,
    pub end_ms: f64,
    pub outcome: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThreadSummary {
    pub tasks: usize,
    pub busy_ms: f64,
}

/// Start/stop times of every executed task, relative to the run start.
#[derive(Debug)]
pub struct RuntimeLog {
    start: Instant,
    full: bool,
    entries: Vec<LogEntry>,
}

impl RuntimeLog {
    pub fn new(full: bool) -> Self {
        Self {
            start: Instant::now(),
            full,
            entries: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        node: impl Into<String>,
        thread: impl Into<String>,
        started: Instant,
        finished: Instant,
        outcome: &'static str,
    ) {
        self.entries.push(LogEntry {
            node: node.into(),
            thread: thread.into(),
            start_ms: self.millis(started),
            end_ms: self.millis(finished),
            outcome,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn summary(&self) -> BTreeMap<String, ThreadSummary> {
        let mut threads: BTreeMap<String, ThreadSummary> = BTreeMap::new();
        for entry in &self.entries {
            let summary = threads.entry(entry.thread.clone()).or_default();
            summary.tasks += 1;
            summary.busy_ms += entry.end_ms - entry.start_ms;
        }
        threads
    }

    /// Every entry when the full log was requested, per-thread totals
    /// otherwise.
    pub fn to_json(&self) -> Value {
        let elapsed_ms = self.millis(Instant::now());
        if self.full {
            serde_json::json!({ "elapsed_ms": elapsed_ms, "entries": self.entries })
        } else {
            serde_json::json!({ "elapsed_ms": elapsed_ms, "threads": self.summary() })
        }
    }

    fn millis(&self, at: Instant) -> f64 {
        at.saturating_duration_since(self.start).as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn summary_groups_by_thread() {
        let mut log = RuntimeLog::new(false);
        let t0 = Instant::now();
        log.record("a", "t1", t0, t0 + Duration::from_millis(5), "done");
        log.record("b", "t1", t0, t0 + Duration::from_millis(5), "repeat");
        log.record("c", "t2", t0, t0, "done");

        let summary = log.summary();
        assert_eq!(summary["t1"].tasks, 2);
        assert_eq!(summary["t2"].tasks, 1);
        assert!(log.to_json().get("threads").is_some());
    }

    #[test]
    fn full_log_lists_entries() {
        let mut log = RuntimeLog::new(true);
        let t0 = Instant::now();
        log.record("a", "t1", t0, t0, "done");
        let json = log.to_json();
        assert_eq!(json["entries"][0]["node"], "a");
    }
}
