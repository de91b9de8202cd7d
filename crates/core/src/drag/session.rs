//! Drag gesture tracking

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::kanban::{Board, Lane, TaskId};
use crate::Result;

/// State of the drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    /// No task is being dragged
    #[default]
    Idle,
    /// A task has been picked up and is waiting for a drop
    Armed { task_id: TaskId, source_lane: Lane },
}

impl DragState {
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }
}

/// Result of dropping onto a lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DropOutcome {
    /// The task moved to the tail of the target lane
    Moved {
        task_id: TaskId,
        from: Lane,
        to: Lane,
    },
    /// Dropped back onto the lane it came from
    SameLane { task_id: TaskId, lane: Lane },
    /// The task is no longer in its source lane (deleted or moved meanwhile)
    Stale { task_id: TaskId, source_lane: Lane },
    /// Nothing was picked up
    NotArmed,
}

impl DropOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Bridges the pick-up and drop halves of a drag gesture into one move
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state.is_armed()
    }

    /// The picked-up task and its source lane, if any
    pub fn armed(&self) -> Option<(TaskId, Lane)> {
        match self.state {
            DragState::Armed {
                task_id,
                source_lane,
            } => Some((task_id, source_lane)),
            DragState::Idle => None,
        }
    }

    /// Pick up a task.
    ///
    /// Only one task can be armed at a time; a second pick-up is rejected and
    /// the armed session is kept.
    pub fn pick_up(&mut self, task_id: TaskId, source_lane: Lane) -> Result<()> {
        if let DragState::Armed { task_id: armed, .. } = self.state {
            return Err(Error::DragInProgress { task_id: armed });
        }

        debug!("Picked up task {} from {}", task_id, source_lane);
        self.state = DragState::Armed {
            task_id,
            source_lane,
        };
        Ok(())
    }

    /// Drop the armed task onto `target`.
    ///
    /// The session returns to idle whatever the move result.
    pub fn drop_on(&mut self, target: Lane, board: &mut Board) -> DropOutcome {
        let DragState::Armed {
            task_id,
            source_lane,
        } = std::mem::take(&mut self.state)
        else {
            return DropOutcome::NotArmed;
        };

        if board.move_task(task_id, source_lane, target) {
            DropOutcome::Moved {
                task_id,
                from: source_lane,
                to: target,
            }
        } else if source_lane == target {
            DropOutcome::SameLane {
                task_id,
                lane: target,
            }
        } else {
            debug!(
                "Dropped stale task {} (no longer in {})",
                task_id, source_lane
            );
            DropOutcome::Stale {
                task_id,
                source_lane,
            }
        }
    }

    /// Abort the gesture without moving anything.
    ///
    /// Returns true if a task was armed.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.is_armed();
        if was_armed {
            debug!("Drag cancelled");
        }
        self.state = DragState::Idle;
        was_armed
    }

    /// Abort the gesture if `task_id` is the armed task
    pub fn cancel_for(&mut self, task_id: TaskId) -> bool {
        match self.state {
            DragState::Armed { task_id: armed, .. } if armed == task_id => self.cancel(),
            _ => false,
        }
    }
}
