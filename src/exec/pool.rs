// src/exec/pool.rs

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{error, trace};

use crate::engine::{Job, RuntimeEvent, execute};
use crate::errors::Result;

use super::backend::ExecutorBackend;

/// Runs each job with `spawn_blocking`: task bodies are synchronous and
/// may block on IO for their whole duration. The scheduler bounds how many
/// are in flight.
pub struct PoolExecutor {
    tx: mpsc::Sender<RuntimeEvent>,
}

impl PoolExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { tx: runtime_tx }
    }
}

impl ExecutorBackend for PoolExecutor {
    fn spawn_jobs(
        &mut self,
        jobs: Vec<Job>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for job in jobs {
                let tx = tx.clone();
                let node = job.node;
                trace!(node = %job.path(), "spawning job");

                tokio::spawn(async move {
                    let event = match tokio::task::spawn_blocking(move || execute(job)).await {
                        Ok(completion) => RuntimeEvent::TaskCompleted(completion),
                        Err(err) => RuntimeEvent::WorkerLost {
                            node,
                            message: err.to_string(),
                        },
                    };
                    if tx.send(event).await.is_err() {
                        error!(%node, "runtime stopped listening; dropping completion");
                    }
                });
            }
            Ok(())
        })
    }
}
