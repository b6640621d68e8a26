//! Dispatch channel between request handlers and the worker
//!
//! FIFO handoff of stored tasks. Unbounded unless a capacity is given, in
//! which case senders wait for room.
//!
//! The pipeline assumes exactly one worker keeps draining the receiver. If the
//! receiver is dropped, sends fail with [`Error::DispatchClosed`] and the task
//! stays `PENDING` in the store.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::stats::PipelineStats;
use crate::task::Task;
use crate::{Error, Result};

#[derive(Clone)]
enum SenderKind {
    Unbounded(mpsc::UnboundedSender<Task>),
    Bounded(mpsc::Sender<Task>),
}

enum ReceiverKind {
    Unbounded(mpsc::UnboundedReceiver<Task>),
    Bounded(mpsc::Receiver<Task>),
}

/// Producer side, cloned into every request handler
#[derive(Clone)]
pub struct TaskSender {
    inner: SenderKind,
    stats: Arc<PipelineStats>,
}

/// Consumer side, owned by the single worker
pub struct TaskReceiver {
    inner: ReceiverKind,
}

/// Create a dispatch channel.
///
/// `None` (or a zero capacity) gives an unbounded channel.
pub fn channel(capacity: Option<usize>, stats: Arc<PipelineStats>) -> (TaskSender, TaskReceiver) {
    let (tx, rx) = match capacity.filter(|c| *c > 0) {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity);
            (SenderKind::Bounded(tx), ReceiverKind::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (SenderKind::Unbounded(tx), ReceiverKind::Unbounded(rx))
        }
    };
    (TaskSender { inner: tx, stats }, TaskReceiver { inner: rx })
}

impl TaskSender {
    /// Hand a stored task to the worker
    pub async fn send(&self, task: Task) -> Result<()> {
        let id = task.id;
        let sent = match &self.inner {
            SenderKind::Unbounded(tx) => tx.send(task).is_ok(),
            SenderKind::Bounded(tx) => tx.send(task).await.is_ok(),
        };
        if !sent {
            tracing::error!("Worker is not running, task {} was not queued", id);
            return Err(Error::DispatchClosed(id));
        }
        self.stats.record_enqueued();
        Ok(())
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self.inner, SenderKind::Bounded(_))
    }
}

impl TaskReceiver {
    /// Wait for the next task; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Task> {
        match &mut self.inner {
            ReceiverKind::Unbounded(rx) => rx.recv().await,
            ReceiverKind::Bounded(rx) => rx.recv().await,
        }
    }
}
