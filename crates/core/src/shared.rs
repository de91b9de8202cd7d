//! Thread-safe board handle
//!
//! Serializes every operation on a `BoardContext` behind one async mutex so
//! hosts with several tasks or threads keep the run-to-completion model.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::context::{BoardCommand, BoardContext, CommandOutcome};
use crate::kanban::{BoardSnapshot, Lane, LaneCounts, Task, TaskId};
use crate::Result;

/// Cloneable handle to a board context
#[derive(Clone)]
pub struct SharedBoard {
    inner: Arc<Mutex<BoardContext>>,
}

impl SharedBoard {
    pub fn new(context: BoardContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    pub async fn execute(&self, command: BoardCommand) -> Result<CommandOutcome> {
        self.inner.lock().await.execute(command)
    }

    /// Adding never touches the drag session, so it goes to the board directly
    pub async fn add_task(&self, lane: Lane, text: &str) -> Result<Task> {
        self.inner.lock().await.board_mut().add_task(lane, text)
    }

    pub async fn delete_task(&self, lane: Lane, task_id: TaskId) -> bool {
        matches!(
            self.execute(BoardCommand::DeleteTask { lane, task_id }).await,
            Ok(CommandOutcome::Deleted { removed: true, .. })
        )
    }

    pub async fn move_task(&self, task_id: TaskId, source: Lane, target: Lane) -> bool {
        let command = BoardCommand::MoveTask {
            task_id,
            source_lane: source,
            target_lane: target,
        };
        matches!(
            self.execute(command).await,
            Ok(CommandOutcome::Moved { moved: true, .. })
        )
    }

    pub async fn counts(&self) -> LaneCounts {
        self.inner.lock().await.counts()
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        self.inner.lock().await.board().snapshot()
    }

    /// Run a closure with exclusive access to the context
    pub async fn with<R>(&self, f: impl FnOnce(&mut BoardContext) -> R) -> R {
        let mut context = self.inner.lock().await;
        f(&mut *context)
    }
}

impl From<BoardContext> for SharedBoard {
    fn from(context: BoardContext) -> Self {
        Self::new(context)
    }
}
