//! Kanban board model definitions
//!
//! The serialized shapes match the persisted layout: lanes are a JSON object
//! keyed by lane name, tasks carry a numeric id and an ISO-8601 `createdAt`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::Result;

/// Board-unique task identifier, assigned from a monotonic counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// The id handed out by a fresh board
    pub const FIRST: TaskId = TaskId(1);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// The id that follows this one, `None` once the id space is used up
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| Error::InvalidInput(format!("Invalid task id: {:?}", s)))
    }
}

/// One of the three fixed board lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Todo,
    Doing,
    Done,
}

impl Default for Lane {
    fn default() -> Self {
        Self::Todo
    }
}

impl Lane {
    /// All lanes in display order
    pub const ALL: [Lane; 3] = [Lane::Todo, Lane::Doing, Lane::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
        }
    }

    /// Column heading shown to the user
    pub fn title(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::Doing => "Doing",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lane {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "doing" => Ok(Self::Doing),
            "done" => Ok(Self::Done),
            _ => Err(Error::UnknownLane(s.to_string())),
        }
    }
}

/// Trim task text and reject it when nothing is left
pub fn normalize_task_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Task text cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// A card on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task stamped with the current time
    pub fn new(id: TaskId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered task sequences for every lane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneTasks {
    pub todo: Vec<Task>,
    pub doing: Vec<Task>,
    pub done: Vec<Task>,
}

impl LaneTasks {
    pub fn get(&self, lane: Lane) -> &[Task] {
        match lane {
            Lane::Todo => &self.todo,
            Lane::Doing => &self.doing,
            Lane::Done => &self.done,
        }
    }

    pub fn get_mut(&mut self, lane: Lane) -> &mut Vec<Task> {
        match lane {
            Lane::Todo => &mut self.todo,
            Lane::Doing => &mut self.doing,
            Lane::Done => &mut self.done,
        }
    }

    /// Iterate lanes in display order
    pub fn iter(&self) -> impl Iterator<Item = (Lane, &[Task])> + '_ {
        Lane::ALL.into_iter().map(move |lane| (lane, self.get(lane)))
    }

    pub fn max_id(&self) -> Option<TaskId> {
        self.iter()
            .flat_map(|(_, tasks)| tasks.iter().map(|task| task.id))
            .max()
    }

    /// Smallest counter value above every stored id
    pub fn id_floor(&self) -> Result<TaskId> {
        match self.max_id() {
            Some(max) => max.checked_next().ok_or_else(|| {
                Error::CorruptSnapshot(format!("task id {} leaves no id to assign", max))
            }),
            None => Ok(TaskId::FIRST),
        }
    }
}

/// Number of tasks per lane
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneCounts {
    pub todo: usize,
    pub doing: usize,
    pub done: usize,
}

impl LaneCounts {
    pub fn get(&self, lane: Lane) -> usize {
        match lane {
            Lane::Todo => self.todo,
            Lane::Doing => self.doing,
            Lane::Done => self.done,
        }
    }

    pub fn total(&self) -> usize {
        self.todo + self.doing + self.done
    }
}

/// Serializable board state: lane contents plus the next id to assign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub lanes: LaneTasks,
    pub next_id: TaskId,
}

impl Default for BoardSnapshot {
    fn default() -> Self {
        Self {
            lanes: LaneTasks::default(),
            next_id: TaskId::FIRST,
        }
    }
}

/// In-memory board: the three lanes and the id counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    lanes: LaneTasks,
    next_id: TaskId,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardState {
    /// Create an empty board whose first task gets id 1
    pub fn new() -> Self {
        Self {
            lanes: LaneTasks::default(),
            next_id: TaskId::FIRST,
        }
    }

    /// Create an empty board that continues numbering at `next_id`
    pub fn with_next_id(next_id: TaskId) -> Self {
        Self {
            lanes: LaneTasks::default(),
            next_id: next_id.max(TaskId::FIRST),
        }
    }

    /// Rebuild a board from a snapshot, checking the board invariants.
    ///
    /// A counter that does not exceed every stored id is raised to
    /// `max(id) + 1`; duplicate ids or blank text make the snapshot corrupt.
    pub fn from_snapshot(snapshot: BoardSnapshot) -> Result<Self> {
        let mut seen = HashSet::new();
        for (lane, tasks) in snapshot.lanes.iter() {
            for task in tasks {
                if !seen.insert(task.id) {
                    return Err(Error::CorruptSnapshot(format!(
                        "task id {} appears more than once (found again in {})",
                        task.id, lane
                    )));
                }
                if task.text.trim().is_empty() {
                    return Err(Error::CorruptSnapshot(format!(
                        "task {} in {} has empty text",
                        task.id, lane
                    )));
                }
            }
        }

        let floor = snapshot.lanes.id_floor()?;
        let next_id = snapshot.next_id.max(floor);

        Ok(Self {
            lanes: snapshot.lanes,
            next_id,
        })
    }

    /// Append a new task to the tail of `lane`.
    ///
    /// Blank text and an exhausted counter are rejected before an id is
    /// consumed.
    pub fn add_task(&mut self, lane: Lane, text: &str) -> Result<Task> {
        let text = normalize_task_text(text)?;
        let next_id = self
            .next_id
            .checked_next()
            .ok_or(Error::IdsExhausted { next_id: self.next_id })?;
        let task = Task::new(self.next_id, text);
        self.next_id = next_id;
        self.lanes.get_mut(lane).push(task.clone());
        Ok(task)
    }

    /// Remove a task from `lane`. Returns `None` when the id is not in that lane.
    pub fn delete_task(&mut self, lane: Lane, task_id: TaskId) -> Option<Task> {
        let tasks = self.lanes.get_mut(lane);
        let index = tasks.iter().position(|task| task.id == task_id)?;
        Some(tasks.remove(index))
    }

    /// Move a task from `source` to the tail of `target`
    pub fn move_task(&mut self, task_id: TaskId, source: Lane, target: Lane) -> bool {
        if source == target {
            return false;
        }

        let Some(task) = self.delete_task(source, task_id) else {
            return false;
        };

        self.lanes.get_mut(target).push(task);
        true
    }

    pub fn counts(&self) -> LaneCounts {
        LaneCounts {
            todo: self.lanes.todo.len(),
            doing: self.lanes.doing.len(),
            done: self.lanes.done.len(),
        }
    }

    pub fn tasks(&self, lane: Lane) -> &[Task] {
        self.lanes.get(lane)
    }

    /// Find a task and the lane that holds it
    pub fn get_task(&self, task_id: TaskId) -> Option<(Lane, &Task)> {
        self.lanes.iter().find_map(|(lane, tasks)| {
            tasks
                .iter()
                .find(|task| task.id == task_id)
                .map(|task| (lane, task))
        })
    }

    pub fn contains(&self, lane: Lane, task_id: TaskId) -> bool {
        self.tasks(lane).iter().any(|task| task.id == task_id)
    }

    pub fn total(&self) -> usize {
        self.counts().total()
    }

    pub fn next_id(&self) -> TaskId {
        self.next_id
    }

    pub fn lanes(&self) -> &LaneTasks {
        &self.lanes
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            lanes: self.lanes.clone(),
            next_id: self.next_id,
        }
    }
}
