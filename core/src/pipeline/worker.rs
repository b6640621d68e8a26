//! Background completion worker
//!
//! Drains the dispatch channel one task at a time: waits out the simulated
//! processing delay, then records the task as completed. A failed status
//! update is logged and counted but never retried, so the row stays
//! `PENDING`.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::dispatch::TaskReceiver;
use super::stats::PipelineStats;
use crate::task::{Task, TaskRepository};
use crate::Result;

/// Simulated processing time per task
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_secs(5);

pub struct Worker {
    store: Arc<dyn TaskRepository>,
    receiver: TaskReceiver,
    delay: Duration,
    stats: Arc<PipelineStats>,
}

impl Worker {
    pub fn new(
        store: Arc<dyn TaskRepository>,
        receiver: TaskReceiver,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            store,
            receiver,
            delay: DEFAULT_PROCESSING_DELAY,
            stats,
        }
    }

    /// Override the simulated processing delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Start the worker loop on the runtime.
    ///
    /// Consumes the worker, so a receiver is only ever drained by one loop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process tasks until every sender has been dropped
    pub async fn run(mut self) {
        info!("Worker started (processing delay {:?})", self.delay);
        while let Some(task) = self.receiver.recv().await {
            let id = task.id;
            match self.process(task).await {
                Ok(task) => {
                    self.stats.record_completed();
                    info!("Task {} ({}) processed", task.id, task.title);
                }
                Err(e) => {
                    self.stats.record_failed();
                    error!("Failed to record completion of task {}: {}", id, e);
                }
            }
        }
        info!("Dispatch channel closed, worker stopping");
    }

    async fn process(&self, mut task: Task) -> Result<Task> {
        info!("Processing task {} ({})", task.id, task.title);
        tokio::time::sleep(self.delay).await;
        task.mark_completed();
        self.store.update_status(task.id, task.status).await?;
        Ok(task)
    }
}
