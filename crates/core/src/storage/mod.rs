//! Board persistence
//!
//! The board is stored as two independent entries in a string key-value
//! store: the lane contents as JSON and the next id as a decimal string.
//! The writes are not atomic; `StorageGateway::load` repairs a counter that
//! lags behind the stored tasks.

mod file_store;
mod memory;

pub use file_store::JsonFileStore;
pub use memory::MemoryStore;

use tracing::{debug, warn};

use crate::config::{BoardConfig, DEFAULT_COUNTER_KEY, DEFAULT_TASKS_KEY};
use crate::error::Error;
use crate::kanban::{BoardSnapshot, LaneTasks, TaskId};
use crate::Result;

/// String key-value storage backing the board
pub trait KeyValueStore: Send {
    /// Read a value, `None` when the key was never written or was removed
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a value
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Saves and loads board snapshots under the configured keys
pub struct StorageGateway {
    store: Box<dyn KeyValueStore>,
    tasks_key: String,
    counter_key: String,
}

impl StorageGateway {
    pub fn new(store: impl KeyValueStore + 'static, config: &BoardConfig) -> Result<Self> {
        Self::from_boxed(Box::new(store), config)
    }

    /// Wrap `store`, rejecting a config whose keys would overwrite each other
    pub fn from_boxed(store: Box<dyn KeyValueStore>, config: &BoardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            tasks_key: config.tasks_key.clone(),
            counter_key: config.counter_key.clone(),
        })
    }

    /// Gateway over a fresh in-memory store with the default keys
    pub fn in_memory() -> Self {
        Self {
            store: Box::new(MemoryStore::new()),
            tasks_key: DEFAULT_TASKS_KEY.to_string(),
            counter_key: DEFAULT_COUNTER_KEY.to_string(),
        }
    }

    /// Write the lanes, then the counter. Either write may fail independently.
    pub fn save(&mut self, snapshot: &BoardSnapshot) -> Result<()> {
        let lanes = serde_json::to_string(&snapshot.lanes)?;
        self.store.set(&self.tasks_key, &lanes)?;
        self.store
            .set(&self.counter_key, &snapshot.next_id.to_string())?;

        debug!(
            "Saved board snapshot ({} tasks, next id {})",
            snapshot.lanes.iter().map(|(_, tasks)| tasks.len()).sum::<usize>(),
            snapshot.next_id
        );
        Ok(())
    }

    /// Read the last saved snapshot.
    ///
    /// Returns `Ok(None)` when nothing was ever saved. A counter without
    /// lanes yields an empty board that keeps the counter; lanes without a
    /// counter yield a snapshot whose counter is rebuilt from the tasks.
    pub fn load(&self) -> Result<Option<BoardSnapshot>> {
        let raw_lanes = self.store.get(&self.tasks_key)?;
        let counter = self.load_counter()?;

        let lanes = match raw_lanes {
            Some(raw) => serde_json::from_str::<LaneTasks>(&raw).map_err(|e| {
                Error::CorruptSnapshot(format!("Failed to parse {}: {}", self.tasks_key, e))
            })?,
            None => match counter {
                Some(next_id) => {
                    warn!(
                        "Found {} without {}; starting with empty lanes",
                        self.counter_key, self.tasks_key
                    );
                    return Ok(Some(BoardSnapshot {
                        lanes: LaneTasks::default(),
                        next_id,
                    }));
                }
                None => return Ok(None),
            },
        };

        let floor = lanes.id_floor()?;
        let next_id = match counter {
            Some(next_id) if next_id >= floor => next_id,
            Some(next_id) => {
                warn!(
                    "Stored counter {} lags behind stored tasks; raising to {}",
                    next_id, floor
                );
                floor
            }
            None => {
                warn!(
                    "Found {} without {}; deriving next id {}",
                    self.tasks_key, self.counter_key, floor
                );
                floor
            }
        };

        Ok(Some(BoardSnapshot { lanes, next_id }))
    }

    /// Read only the stored counter, `None` when it was never written
    pub fn load_counter(&self) -> Result<Option<TaskId>> {
        self.store
            .get(&self.counter_key)?
            .as_deref()
            .map(|raw| self.parse_counter(raw))
            .transpose()
    }

    /// Remove both entries
    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(&self.tasks_key)?;
        self.store.remove(&self.counter_key)?;
        Ok(())
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn into_store(self) -> Box<dyn KeyValueStore> {
        self.store
    }

    fn parse_counter(&self, raw: &str) -> Result<TaskId> {
        raw.trim()
            .parse::<u64>()
            .map(TaskId::new)
            .map_err(|_| {
                Error::CorruptSnapshot(format!(
                    "{} is not an integer: {:?}",
                    self.counter_key, raw
                ))
            })
    }
}
