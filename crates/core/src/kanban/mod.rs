//! Kanban board management
//!
//! This module provides board state management for the three-lane layout
//! (Todo, Doing, Done): the pure model, change notifications, and the
//! persistent `Board` that ties them to storage.

mod event;
mod model;
mod store;

pub use event::*;
pub use model::*;
pub use store::*;
