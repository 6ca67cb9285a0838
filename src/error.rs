//! Crate-wide error types.

use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::engine_state::rendering::scene::NodeId;

/// Errors surfaced by the preview pipeline.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// A task was submitted after `TaskPool::shutdown` was requested.
    #[error("task pool is shutting down")]
    PoolShuttingDown,

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// A size or rectangle with a zero or negative dimension.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    /// A runnable failed; carried as data, never as a panic.
    #[error(transparent)]
    TaskFailure(#[from] TaskFailure),

    /// No node with this id lives in the scene.
    #[error("unknown scene node: {0:?}")]
    UnknownNode(NodeId),

    /// An external image skin could not be decoded.
    #[error("failed to load image '{}': {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The display sink rejected a blit or present.
    #[error("display sink error: {0}")]
    Sink(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PreviewError {
    pub(crate) fn invalid_dimensions(width: impl Into<i64>, height: impl Into<i64>) -> Self {
        PreviewError::InvalidDimensions {
            width: width.into(),
            height: height.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PreviewError>;

/// Failure of a single task iteration.
///
/// Cloneable so the same failure can be posted as an event and kept for
/// whoever waits on the task handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    message: String,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Builds a failure from the payload of a caught panic.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "runnable panicked".to_string()
        };
        Self::new(format!("panic: {message}"))
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task failed: {}", self.message)
    }
}

impl std::error::Error for TaskFailure {}

impl From<image::ImageError> for TaskFailure {
    fn from(err: image::ImageError) -> Self {
        TaskFailure::new(err.to_string())
    }
}
