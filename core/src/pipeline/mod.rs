//! Task-processing pipeline
//!
//! Request handlers push stored tasks into the dispatch channel and a single
//! background worker drains it, marking each task completed.

mod dispatch;
mod stats;
mod worker;

pub use dispatch::{channel, TaskReceiver, TaskSender};
pub use stats::{PipelineStats, PipelineStatsSnapshot};
pub use worker::{Worker, DEFAULT_PROCESSING_DELAY};
