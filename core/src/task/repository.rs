//! Task repository trait
//!
//! Defines the interface for task storage operations.

use async_trait::async_trait;

use super::model::{NewTask, Task, TaskStatus};
use crate::Result;

/// Repository interface shared by request handlers and the worker
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new task and return the identifier assigned by the store
    async fn insert(&self, task: &NewTask) -> Result<i64>;

    /// Set the status of a task.
    ///
    /// Updating an identifier that does not exist is not an error.
    async fn update_status(&self, id: i64, status: TaskStatus) -> Result<()>;

    /// Get every stored task in storage order
    async fn list_all(&self) -> Result<Vec<Task>>;
}
