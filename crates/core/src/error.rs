//! Error types for the core library

use thiserror::Error;

use crate::kanban::TaskId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Drag already in progress for task {task_id}")]
    DragInProgress { task_id: TaskId },

    #[error("Unknown lane: {0}")]
    UnknownLane(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Task ids exhausted at {next_id}")]
    IdsExhausted { next_id: TaskId },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error is a rejected user input the caller can retry
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::UnknownLane(_))
    }
}
