//! Change notifications emitted by the board

use serde::{Deserialize, Serialize};

use super::model::{Lane, LaneCounts, Task, TaskId};
use crate::error::Error;

/// A committed change to the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardChange {
    TaskAdded {
        lane: Lane,
        task: Task,
    },
    TaskDeleted {
        lane: Lane,
        task_id: TaskId,
    },
    TaskMoved {
        task_id: TaskId,
        from: Lane,
        to: Lane,
    },
    /// The whole board was replaced
    Restored,
}

impl BoardChange {
    /// Lanes whose contents changed
    pub fn lanes(&self) -> Vec<Lane> {
        match self {
            Self::TaskAdded { lane, .. } | Self::TaskDeleted { lane, .. } => vec![*lane],
            Self::TaskMoved { from, to, .. } => vec![*from, *to],
            Self::Restored => Lane::ALL.to_vec(),
        }
    }
}

/// Receives board notifications, typically a view layer that re-renders
pub trait BoardObserver: Send {
    /// Called after every committed change, with the lane counts after it
    fn on_change(&mut self, change: &BoardChange, counts: LaneCounts);

    /// Called once when persistence is lost for the rest of the session
    fn on_storage_error(&mut self, _error: &Error) {}
}

impl<F> BoardObserver for F
where
    F: FnMut(&BoardChange, LaneCounts) + Send,
{
    fn on_change(&mut self, change: &BoardChange, counts: LaneCounts) {
        self(change, counts)
    }
}
