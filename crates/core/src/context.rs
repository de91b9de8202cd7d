//! Command interface for a view layer
//!
//! A `BoardContext` owns one board and its drag session. View code turns
//! user input into `BoardCommand`s and renders from the returned
//! `CommandOutcome` plus the board's change notifications.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::drag::{DragSession, DropOutcome};
use crate::kanban::{Board, BoardObserver, BoardSnapshot, Lane, LaneCounts, Task, TaskId};
use crate::storage::StorageGateway;
use crate::Result;

// ============ Commands ============

/// Input from the view layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BoardCommand {
    #[serde(rename_all = "camelCase")]
    AddTask { lane: Lane, text: String },
    #[serde(rename_all = "camelCase")]
    DeleteTask { lane: Lane, task_id: TaskId },
    #[serde(rename_all = "camelCase")]
    MoveTask {
        task_id: TaskId,
        source_lane: Lane,
        target_lane: Lane,
    },
    /// Drag start over a task card
    #[serde(rename_all = "camelCase")]
    PickUp { task_id: TaskId, lane: Lane },
    /// Drop over a lane container
    Drop { lane: Lane },
    /// Drag ended outside any lane, or was aborted
    CancelDrag,
}

/// What a command did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Added {
        task: Task,
    },
    #[serde(rename_all = "camelCase")]
    Deleted { task_id: TaskId, removed: bool },
    #[serde(rename_all = "camelCase")]
    Moved { task_id: TaskId, moved: bool },
    #[serde(rename_all = "camelCase")]
    PickedUp { task_id: TaskId, lane: Lane },
    Dropped {
        result: DropOutcome,
    },
    #[serde(rename_all = "camelCase")]
    DragCancelled { was_armed: bool },
}

// ============ Context ============

/// One board plus the drag gesture in flight over it
pub struct BoardContext {
    board: Board,
    drag: DragSession,
}

impl BoardContext {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            drag: DragSession::new(),
        }
    }

    /// Open a board from storage and wrap it
    pub fn open(gateway: StorageGateway) -> Self {
        Self::new(Board::open(gateway))
    }

    pub fn in_memory() -> Self {
        Self::new(Board::in_memory())
    }

    /// Run one command to completion.
    ///
    /// Blank task text, an exhausted id counter and a pick-up during an
    /// active drag are returned as errors; every other command succeeds,
    /// reporting no-ops in the outcome.
    pub fn execute(&mut self, command: BoardCommand) -> Result<CommandOutcome> {
        debug!("Executing {:?}", command);

        let outcome = match command {
            BoardCommand::AddTask { lane, text } => {
                let task = self.board.add_task(lane, &text)?;
                CommandOutcome::Added { task }
            }
            BoardCommand::DeleteTask { lane, task_id } => {
                let removed = self.board.delete_task(lane, task_id).is_some();
                if removed {
                    self.drag.cancel_for(task_id);
                }
                CommandOutcome::Deleted { task_id, removed }
            }
            BoardCommand::MoveTask {
                task_id,
                source_lane,
                target_lane,
            } => {
                let moved = self.board.move_task(task_id, source_lane, target_lane);
                if moved {
                    self.drag.cancel_for(task_id);
                }
                CommandOutcome::Moved { task_id, moved }
            }
            BoardCommand::PickUp { task_id, lane } => {
                self.drag.pick_up(task_id, lane)?;
                CommandOutcome::PickedUp { task_id, lane }
            }
            BoardCommand::Drop { lane } => CommandOutcome::Dropped {
                result: self.drag.drop_on(lane, &mut self.board),
            },
            BoardCommand::CancelDrag => CommandOutcome::DragCancelled {
                was_armed: self.drag.cancel(),
            },
        };

        Ok(outcome)
    }

    /// Replace the board contents, aborting any drag in flight
    pub fn restore(&mut self, snapshot: BoardSnapshot) -> bool {
        self.drag.cancel();
        self.board.restore(snapshot)
    }

    pub fn subscribe(&mut self, observer: impl BoardObserver + 'static) {
        self.board.subscribe(observer);
    }

    pub fn counts(&self) -> LaneCounts {
        self.board.counts()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Direct board access for operations that cannot disturb the drag
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn drag(&self) -> &DragSession {
        &self.drag
    }

    pub fn into_board(self) -> Board {
        self.board
    }
}

impl Default for BoardContext {
    fn default() -> Self {
        Self::in_memory()
    }
}
