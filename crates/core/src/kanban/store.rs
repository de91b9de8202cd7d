//! Persistent kanban board
//!
//! Wraps `BoardState` with storage and change notification. Every committed
//! mutation is saved through the `StorageGateway` and then broadcast to the
//! registered observers. Storage failures never fail an operation: the first
//! one is reported and persistence is switched off until the board is reopened.

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::storage::StorageGateway;
use crate::Result;

use super::event::{BoardChange, BoardObserver};
use super::model::{BoardSnapshot, BoardState, Lane, LaneCounts, Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Persistence {
    Enabled,
    Disabled { reason: String },
}

/// Board with persistence and change notification
pub struct Board {
    state: BoardState,
    gateway: StorageGateway,
    observers: Vec<Box<dyn BoardObserver>>,
    persistence: Persistence,
}

impl Board {
    /// Open a board, hydrating it from the gateway.
    ///
    /// A missing or corrupt snapshot yields an empty board; a stored counter
    /// that still parses is kept so ids are not reused. If the store
    /// cannot be read at all, the board starts empty with persistence off so
    /// the unreadable data is not overwritten.
    pub fn open(gateway: StorageGateway) -> Self {
        let mut persistence = Persistence::Enabled;

        let state = match gateway.load() {
            Ok(Some(snapshot)) => {
                let next_id = snapshot.next_id;
                match BoardState::from_snapshot(snapshot) {
                    Ok(state) => {
                        info!(
                            "Loaded board with {} tasks (next id {})",
                            state.total(),
                            state.next_id()
                        );
                        state
                    }
                    Err(e) => {
                        warn!("Discarding stored board, keeping next id {}: {}", next_id, e);
                        BoardState::with_next_id(next_id)
                    }
                }
            }
            Ok(None) => {
                info!("No stored board found; starting empty");
                BoardState::new()
            }
            Err(e @ Error::CorruptSnapshot(_)) => {
                // The counter is stored apart from the lanes and may still be good
                let next_id = gateway.load_counter().ok().flatten();
                warn!("Discarding stored board: {}", e);
                next_id.map_or_else(BoardState::new, BoardState::with_next_id)
            }
            Err(e) => {
                warn!("Storage unavailable, continuing without persistence: {}", e);
                persistence = Persistence::Disabled {
                    reason: e.to_string(),
                };
                BoardState::new()
            }
        };

        Self {
            state,
            gateway,
            observers: Vec::new(),
            persistence,
        }
    }

    /// Board backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::open(StorageGateway::in_memory())
    }

    /// Register an observer.
    ///
    /// If persistence is already off, the observer is told right away.
    pub fn subscribe(&mut self, mut observer: impl BoardObserver + 'static) {
        if let Persistence::Disabled { reason } = &self.persistence {
            observer.on_storage_error(&Error::Storage(reason.clone()));
        }
        self.observers.push(Box::new(observer));
    }

    /// Add a task to the tail of `lane`
    pub fn add_task(&mut self, lane: Lane, text: &str) -> Result<Task> {
        let task = self.state.add_task(lane, text)?;
        debug!("Added task {} to {}", task.id, lane);

        self.commit(BoardChange::TaskAdded {
            lane,
            task: task.clone(),
        });
        Ok(task)
    }

    /// Delete a task from `lane`; a task that is not there is left alone
    pub fn delete_task(&mut self, lane: Lane, task_id: TaskId) -> Option<Task> {
        let task = self.state.delete_task(lane, task_id)?;
        debug!("Deleted task {} from {}", task_id, lane);

        self.commit(BoardChange::TaskDeleted { lane, task_id });
        Some(task)
    }

    /// Move a task from `source` to the tail of `target`.
    ///
    /// Returns false without touching the board when the lanes are equal or
    /// the task is not in `source`.
    pub fn move_task(&mut self, task_id: TaskId, source: Lane, target: Lane) -> bool {
        if !self.state.move_task(task_id, source, target) {
            debug!("Ignored move of task {} from {} to {}", task_id, source, target);
            return false;
        }
        debug!("Moved task {} from {} to {}", task_id, source, target);

        self.commit(BoardChange::TaskMoved {
            task_id,
            from: source,
            to: target,
        });
        true
    }

    /// Replace the whole board.
    ///
    /// A snapshot that breaks the board invariants is replaced by an empty
    /// board and false is returned. The empty board keeps the current id
    /// counter, and only an accepted snapshot is saved.
    pub fn restore(&mut self, snapshot: BoardSnapshot) -> bool {
        match BoardState::from_snapshot(snapshot) {
            Ok(state) => {
                self.state = state;
                self.commit(BoardChange::Restored);
                true
            }
            Err(e) => {
                warn!("Rejected snapshot, resetting to an empty board: {}", e);
                self.state = BoardState::with_next_id(self.state.next_id());
                self.notify(&BoardChange::Restored);
                false
            }
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.state.snapshot()
    }

    pub fn counts(&self) -> LaneCounts {
        self.state.counts()
    }

    pub fn tasks(&self, lane: Lane) -> &[Task] {
        self.state.tasks(lane)
    }

    pub fn get_task(&self, task_id: TaskId) -> Option<(Lane, &Task)> {
        self.state.get_task(task_id)
    }

    pub fn contains(&self, lane: Lane, task_id: TaskId) -> bool {
        self.state.contains(lane, task_id)
    }

    pub fn total(&self) -> usize {
        self.state.total()
    }

    pub fn next_id(&self) -> TaskId {
        self.state.next_id()
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Whether mutations are still being saved
    pub fn is_persistent(&self) -> bool {
        self.persistence == Persistence::Enabled
    }

    /// Why persistence was switched off, if it was
    pub fn storage_error(&self) -> Option<&str> {
        match &self.persistence {
            Persistence::Enabled => None,
            Persistence::Disabled { reason } => Some(reason.as_str()),
        }
    }

    /// Hand back the gateway, e.g. to reopen the board from it
    pub fn into_gateway(self) -> StorageGateway {
        self.gateway
    }

    fn commit(&mut self, change: BoardChange) {
        self.persist();
        self.notify(&change);
    }

    fn persist(&mut self) {
        if !self.is_persistent() {
            return;
        }

        let snapshot = self.state.snapshot();
        if let Err(e) = self.gateway.save(&snapshot) {
            warn!("Storage unavailable, continuing without persistence: {}", e);
            for observer in &mut self.observers {
                observer.on_storage_error(&e);
            }
            self.persistence = Persistence::Disabled {
                reason: e.to_string(),
            };
        }
    }

    fn notify(&mut self, change: &BoardChange) {
        let counts = self.state.counts();
        for observer in &mut self.observers {
            observer.on_change(change, counts);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::storage::testing::{Faults, FaultyStore};
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::mpsc;

    /// Observer forwarding everything it sees over channels
    struct Recorder {
        changes: mpsc::Sender<(BoardChange, LaneCounts)>,
        errors: mpsc::Sender<String>,
    }

    impl BoardObserver for Recorder {
        fn on_change(&mut self, change: &BoardChange, counts: LaneCounts) {
            let _ = self.changes.send((change.clone(), counts));
        }

        fn on_storage_error(&mut self, error: &Error) {
            let _ = self.errors.send(error.to_string());
        }
    }

    fn recorder() -> (
        Recorder,
        mpsc::Receiver<(BoardChange, LaneCounts)>,
        mpsc::Receiver<String>,
    ) {
        let (changes, change_rx) = mpsc::channel();
        let (errors, error_rx) = mpsc::channel();
        (Recorder { changes, errors }, change_rx, error_rx)
    }

    fn ids(board: &Board, lane: Lane) -> Vec<u64> {
        board.tasks(lane).iter().map(|task| task.id.value()).collect()
    }

    #[test]
    fn test_scenario() {
        let mut board = Board::in_memory();

        let first = board.add_task(Lane::Todo, "write spec").unwrap();
        assert_eq!(first.id, TaskId::new(1));
        assert_eq!(ids(&board, Lane::Todo), vec![1]);

        let second = board.add_task(Lane::Todo, "review").unwrap();
        assert_eq!(second.id, TaskId::new(2));
        assert_eq!(ids(&board, Lane::Todo), vec![1, 2]);

        assert!(board.move_task(first.id, Lane::Todo, Lane::Doing));
        assert_eq!(ids(&board, Lane::Todo), vec![2]);
        assert_eq!(ids(&board, Lane::Doing), vec![1]);

        let before = board.snapshot();
        assert!(!board.move_task(first.id, Lane::Todo, Lane::Doing));
        assert_eq!(board.snapshot(), before);

        assert!(board.delete_task(Lane::Doing, first.id).is_some());
        assert!(board.tasks(Lane::Doing).is_empty());

        assert_eq!(board.counts(), LaneCounts { todo: 1, doing: 0, done: 0 });
    }

    #[test]
    fn test_ids_are_monotonic_and_counts_match() {
        let mut board = Board::in_memory();
        let texts = ["a", " ", "b", "", "c", "\t", "d"];
        let lanes = [Lane::Todo, Lane::Doing, Lane::Done];

        let mut last = 0;
        let mut added = 0;
        for (i, text) in texts.iter().enumerate() {
            if let Ok(task) = board.add_task(lanes[i % 3], text) {
                assert!(task.id.value() > last);
                last = task.id.value();
                added += 1;
            }
        }

        assert_eq!(added, 4);
        assert_eq!(board.counts().total(), added);
        assert_eq!(board.next_id(), TaskId::new(5));
    }

    #[test]
    fn test_rejected_add_is_not_saved_or_notified() {
        let mut board = Board::in_memory();
        let (observer, changes, _) = recorder();
        board.subscribe(observer);

        assert!(board.add_task(Lane::Todo, "   ").unwrap_err().is_validation());
        assert!(changes.try_recv().is_err());

        let gateway = board.into_gateway();
        assert!(gateway.load().unwrap().is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut board = Board::in_memory();
        let (observer, changes, _) = recorder();
        let task = board.add_task(Lane::Done, "archive").unwrap();
        board.subscribe(observer);

        assert!(board.delete_task(Lane::Done, task.id).is_some());
        assert!(board.delete_task(Lane::Done, task.id).is_none());

        let seen: Vec<_> = changes.try_iter().collect();
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_delete_from_wrong_lane_keeps_task() {
        let mut board = Board::in_memory();
        let task = board.add_task(Lane::Todo, "keep me").unwrap();

        assert!(board.delete_task(Lane::Doing, task.id).is_none());
        assert!(board.contains(Lane::Todo, task.id));
    }

    #[test]
    fn test_notifications_carry_counts() {
        let mut board = Board::in_memory();
        let (observer, changes, _) = recorder();
        board.subscribe(observer);

        let task = board.add_task(Lane::Todo, "a").unwrap();
        board.move_task(task.id, Lane::Todo, Lane::Done);
        board.move_task(task.id, Lane::Todo, Lane::Done);
        board.delete_task(Lane::Done, task.id);

        let seen: Vec<_> = changes.try_iter().collect();
        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0].0, BoardChange::TaskAdded { lane: Lane::Todo, .. }));
        assert_eq!(seen[0].1, LaneCounts { todo: 1, doing: 0, done: 0 });
        assert_eq!(
            seen[1].0,
            BoardChange::TaskMoved {
                task_id: task.id,
                from: Lane::Todo,
                to: Lane::Done
            }
        );
        assert_eq!(seen[1].1, LaneCounts { todo: 0, doing: 0, done: 1 });
        assert_eq!(seen[2].1.total(), 0);
    }

    #[test]
    fn test_closure_subscriber() {
        let mut board = Board::in_memory();
        let (tx, rx) = mpsc::channel();
        board.subscribe(move |change: &BoardChange, counts: LaneCounts| {
            let _ = tx.send((change.lanes(), counts.total()));
        });

        board.add_task(Lane::Doing, "a").unwrap();
        assert_eq!(rx.try_recv().unwrap(), (vec![Lane::Doing], 1));
    }

    #[test]
    fn test_reopen_restores_board() {
        let mut board = Board::in_memory();
        board.add_task(Lane::Todo, "a").unwrap();
        let b = board.add_task(Lane::Todo, "b").unwrap();
        let c = board.add_task(Lane::Doing, "c").unwrap();
        board.move_task(b.id, Lane::Todo, Lane::Done);
        board.delete_task(Lane::Doing, c.id);
        let before = board.snapshot();

        let reopened = Board::open(board.into_gateway());
        assert_eq!(reopened.snapshot(), before);
        assert_eq!(ids(&reopened, Lane::Done), vec![2]);
    }

    #[test]
    fn test_ids_not_reused_after_reopen() {
        let mut board = Board::in_memory();
        board.add_task(Lane::Todo, "a").unwrap();
        let b = board.add_task(Lane::Todo, "b").unwrap();
        board.delete_task(Lane::Todo, b.id);

        let mut reopened = Board::open(board.into_gateway());
        let next = reopened.add_task(Lane::Todo, "c").unwrap();
        assert_eq!(next.id, TaskId::new(3));
    }

    #[test]
    fn test_file_backed_board_survives_restart() {
        use crate::storage::JsonFileStore;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("board.json");
        let config = BoardConfig::default();

        let before = {
            let store = JsonFileStore::open(&path).unwrap();
            let mut board = Board::open(StorageGateway::new(store, &config).unwrap());
            let a = board.add_task(Lane::Todo, "write spec").unwrap();
            board.add_task(Lane::Todo, "review").unwrap();
            board.move_task(a.id, Lane::Todo, Lane::Done);
            board.snapshot()
        };

        let store = JsonFileStore::open(&path).unwrap();
        let board = Board::open(StorageGateway::new(store, &config).unwrap());
        assert_eq!(board.snapshot(), before);
        assert_eq!(ids(&board, Lane::Done), vec![1]);
        assert_eq!(board.next_id(), TaskId::new(3));
    }

    #[test]
    fn test_corrupt_store_keeps_counter() {
        let mut store = MemoryStore::new();
        store.set("kanban-tasks", r#"{"todo":"nope"}"#).unwrap();
        store.set("kanban-counter", "9").unwrap();

        let mut board = Board::open(StorageGateway::new(store, &BoardConfig::default()).unwrap());
        assert_eq!(board.total(), 0);
        assert!(board.is_persistent());

        let task = board.add_task(Lane::Todo, "fresh").unwrap();
        assert_eq!(task.id, TaskId::new(9));
    }

    #[test]
    fn test_missing_lane_keeps_stored_counter() {
        let mut store = MemoryStore::new();
        store.set("kanban-tasks", r#"{"todo":[],"doing":[]}"#).unwrap();
        store.set("kanban-counter", "9").unwrap();

        let mut board = Board::open(StorageGateway::new(store, &BoardConfig::default()).unwrap());
        assert_eq!(board.total(), 0);
        assert_eq!(board.add_task(Lane::Doing, "fresh").unwrap().id, TaskId::new(9));
    }

    #[test]
    fn test_duplicate_ids_keep_counter_above_stored_ids() {
        let mut store = MemoryStore::new();
        store
            .set(
                "kanban-tasks",
                r#"{"todo":[{"id":4,"text":"a","createdAt":"2024-05-01T09:00:00Z"}],
                    "doing":[{"id":4,"text":"b","createdAt":"2024-05-01T09:00:00Z"}],"done":[]}"#,
            )
            .unwrap();
        store.set("kanban-counter", "2").unwrap();

        let board = Board::open(StorageGateway::new(store, &BoardConfig::default()).unwrap());
        assert_eq!(board.total(), 0);
        assert_eq!(board.next_id(), TaskId::new(5));
    }

    #[test]
    fn test_stored_id_without_successor_opens_empty() {
        let mut store = MemoryStore::new();
        store
            .set(
                "kanban-tasks",
                r#"{"todo":[{"id":18446744073709551615,"text":"a","createdAt":"2024-05-01T09:00:00Z"}],"doing":[],"done":[]}"#,
            )
            .unwrap();
        store.set("kanban-counter", "5").unwrap();

        let mut board = Board::open(StorageGateway::new(store, &BoardConfig::default()).unwrap());
        assert_eq!(board.total(), 0);
        assert!(board.is_persistent());
        assert_eq!(board.add_task(Lane::Todo, "a").unwrap().id, TaskId::new(5));
    }

    #[test]
    fn test_exhausted_counter_rejects_add() {
        let mut store = MemoryStore::new();
        store.set("kanban-counter", "18446744073709551615").unwrap();

        let mut board = Board::open(StorageGateway::new(store, &BoardConfig::default()).unwrap());
        let err = board.add_task(Lane::Todo, "a").unwrap_err();
        assert!(matches!(err, Error::IdsExhausted { .. }));
        assert_eq!(board.total(), 0);
    }

    #[test]
    fn test_write_failure_reported_once() {
        let store = FaultyStore::new(Faults {
            fail_tasks_write: true,
            ..Faults::default()
        });
        let mut board = Board::open(StorageGateway::new(store, &BoardConfig::default()).unwrap());
        let (observer, changes, errors) = recorder();
        board.subscribe(observer);

        board.add_task(Lane::Todo, "a").unwrap();
        let b = board.add_task(Lane::Todo, "b").unwrap();
        board.move_task(b.id, Lane::Todo, Lane::Doing);

        assert!(!board.is_persistent());
        assert!(board.storage_error().unwrap().contains("quota exceeded"));
        assert_eq!(errors.try_iter().count(), 1);
        assert_eq!(changes.try_iter().count(), 3);
        assert_eq!(board.counts(), LaneCounts { todo: 1, doing: 1, done: 0 });
    }

    #[test]
    fn test_unreadable_store_disables_persistence() {
        let store = FaultyStore::new(Faults {
            fail_reads: true,
            ..Faults::default()
        });
        let mut board = Board::open(StorageGateway::new(store, &BoardConfig::default()).unwrap());
        assert!(!board.is_persistent());

        let (observer, _, errors) = recorder();
        board.subscribe(observer);
        assert_eq!(errors.try_iter().count(), 1);

        board.add_task(Lane::Todo, "still works").unwrap();
        assert_eq!(board.total(), 1);
        assert_eq!(errors.try_iter().count(), 0);
    }

    #[test]
    fn test_restore_round_trip() {
        let mut board = Board::in_memory();
        board.add_task(Lane::Todo, "a").unwrap();
        board.add_task(Lane::Done, "b").unwrap();
        let snapshot = board.snapshot();

        let mut other = Board::in_memory();
        let (observer, changes, _) = recorder();
        other.subscribe(observer);

        assert!(other.restore(snapshot.clone()));
        assert_eq!(other.snapshot(), snapshot);
        assert_eq!(changes.try_recv().unwrap().0, BoardChange::Restored);

        let reopened = Board::open(other.into_gateway());
        assert_eq!(reopened.snapshot(), snapshot);
    }

    #[test]
    fn test_restore_rejects_invalid_snapshot() {
        let mut board = Board::in_memory();
        board.add_task(Lane::Todo, "a").unwrap();

        let mut snapshot = board.snapshot();
        let duplicate = snapshot.lanes.todo[0].clone();
        snapshot.lanes.done.push(duplicate);

        assert!(!board.restore(snapshot));
        assert_eq!(board.total(), 0);
        assert_eq!(board.next_id(), TaskId::new(2));

        // The rejected reset is not written over the stored board
        let reopened = Board::open(board.into_gateway());
        assert_eq!(reopened.total(), 1);
    }
}
