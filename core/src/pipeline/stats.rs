//! Pipeline counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the dispatch channel and the worker
#[derive(Debug, Default)]
pub struct PipelineStats {
    enqueued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatsSnapshot {
    pub enqueued: u64,
    pub completed: u64,
    pub failed: u64,
    /// Tasks queued or being processed
    pub in_flight: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        let enqueued = self.enqueued.load(Ordering::Relaxed);
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        PipelineStatsSnapshot {
            enqueued,
            completed,
            failed,
            in_flight: enqueued.saturating_sub(completed + failed),
        }
    }
}
