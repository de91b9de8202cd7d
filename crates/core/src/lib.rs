//! Core library for the task board
//!
//! This crate contains the board logic, including:
//! - Lanes, tasks and id assignment
//! - Drag-and-drop transfer between lanes
//! - Key-value persistence of board snapshots
//! - A command interface for the view layer

pub mod config;
pub mod context;
pub mod drag;
pub mod error;
pub mod kanban;
pub mod shared;
pub mod storage;

pub use config::BoardConfig;
pub use context::{BoardCommand, BoardContext, CommandOutcome};
pub use error::Error;
pub use shared::SharedBoard;
pub type Result<T> = std::result::Result<T, Error>;
