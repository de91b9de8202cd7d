//! Drag-and-drop transfer between lanes

mod session;

pub use session::{DragSession, DragState, DropOutcome};
