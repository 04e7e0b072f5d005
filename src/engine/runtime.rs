// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::exec::ExecutorBackend;
use crate::worker::WorkOutcome;

use super::RuntimeEvent;
use super::core::{RunReport, Scheduler};

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Pause before rescanning when only rejected tasks are left.
    pub retry_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(10),
        }
    }
}

/// Drives the [`Scheduler`] until the tree is complete, and delegates task
/// execution to an [`ExecutorBackend`].
///
/// This is the IO shell around the scheduler: it spawns the jobs a scan
/// produces, waits for completion events, and feeds them back.
pub struct Runtime<E: ExecutorBackend> {
    core: Scheduler,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    options: RuntimeOptions,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: Scheduler,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            options,
        }
    }

    /// Main loop: scan, spawn, wait for completions, repeat.
    ///
    /// Returns once every node (including the ones created on the way) is
    /// done, or with the first fatal error.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(mode = %self.core.context().mode(), "pipetree runtime started");

        loop {
            let step = self.core.scan()?;
            if step.complete {
                break;
            }

            if !step.jobs.is_empty() {
                debug!(jobs = step.jobs.len(), "spawning ready tasks");
                self.executor.spawn_jobs(step.jobs).await?;
            }

            if self.core.in_flight() == 0 {
                if !step.progressed {
                    tokio::time::sleep(self.options.retry_interval).await;
                }
                continue;
            }

            let rejected = self.drain_events().await?;
            if rejected && self.core.in_flight() == 0 {
                tokio::time::sleep(self.options.retry_interval).await;
            }
        }

        let report = self.core.into_report();
        info!(scans = report.scans, nodes = report.tree.node_count(), "runtime finished");
        Ok(report)
    }

    /// Wait for at least one event, then take whatever else is queued.
    /// Returns whether any task rejected its work.
    async fn drain_events(&mut self) -> Result<bool> {
        let first = self.event_rx.recv().await.ok_or_else(|| {
            PipelineError::Other(anyhow::anyhow!(
                "executor event channel closed with {} task(s) in flight",
                self.core.in_flight()
            ))
        })?;

        let mut rejected = self.handle_event(first)?;
        while let Ok(event) = self.event_rx.try_recv() {
            rejected |= self.handle_event(event)?;
        }
        Ok(rejected)
    }

    fn handle_event(&mut self, event: RuntimeEvent) -> Result<bool> {
        debug!(?event, "runtime received event");
        match event {
            RuntimeEvent::TaskCompleted(completion) => {
                let outcome = self.core.complete(completion)?;
                Ok(outcome == WorkOutcome::Repeat)
            }
            RuntimeEvent::WorkerLost { node, message } => {
                warn!(%node, %message, "worker lost");
                Err(self.core.worker_lost(node, message))
            }
        }
    }
}
