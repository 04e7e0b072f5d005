use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use pipetree::engine::{Job, RuntimeEvent, Scheduler, execute};
use pipetree::errors::Result;
use pipetree::exec::ExecutorBackend;

/// A fake executor that:
/// - records the global path of every job it was handed
/// - runs the job on the calling task and reports the completion.
pub struct InlineExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl InlineExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self { runtime_tx, executed }
    }
}

impl ExecutorBackend for InlineExecutor {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<Job>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for job in jobs {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(job.path().to_string());
                }

                tx.send(RuntimeEvent::TaskCompleted(execute(job)))
                    .await
                    .map_err(|e| anyhow::anyhow!("runtime channel closed: {e}"))?;
            }
            Ok(())
        })
    }
}

/// Drive a scheduler to completion on the current thread, running every
/// job as soon as a scan hands it out. Returns the number of scans.
///
/// Panics after `max_scans` scans.
pub fn drive(scheduler: &mut Scheduler, max_scans: usize) -> Result<usize> {
    for scans in 1..=max_scans {
        let step = scheduler.scan()?;
        if step.complete {
            return Ok(scans);
        }
        for job in step.jobs {
            scheduler.complete(execute(job))?;
        }
    }
    panic!("scheduler did not finish within {max_scans} scans");
}
