//! Core library for Tasktrack
//!
//! This crate contains the task-processing pipeline, including:
//! - Task model and storage
//! - Dispatch channel between request handlers and the worker
//! - The background completion worker

pub mod error;
pub mod pipeline;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
