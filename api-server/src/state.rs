//! Application state

use std::sync::Arc;

use tasktrack_core::pipeline::{PipelineStats, TaskSender};
use tasktrack_core::task::TaskRepository;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    task_store: Arc<dyn TaskRepository>,
    dispatcher: TaskSender,
    stats: Arc<PipelineStats>,
}

impl AppState {
    /// Create a new AppState around an already running pipeline
    pub fn new(
        task_store: Arc<dyn TaskRepository>,
        dispatcher: TaskSender,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                task_store,
                dispatcher,
                stats,
            }),
        }
    }

    /// Get reference to the task store
    pub fn task_store(&self) -> &dyn TaskRepository {
        self.inner.task_store.as_ref()
    }

    /// Get the producer side of the dispatch channel
    pub fn dispatcher(&self) -> &TaskSender {
        &self.inner.dispatcher
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.inner.stats
    }
}
