//! Task storage module with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `file`: JSON documents under the data directory

mod file;
mod memory;

pub use file::{FileTaskStore, SEQUENCE_FILE, TASKS_FILE};
pub use memory::InMemoryTaskStore;

use crate::config::StoreType;
use crate::json_file::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Numeric task identifier, stored as a JSON string (`"7"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl TryFrom<String> for TaskId {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.to_string()
    }
}

/// A single entry on the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub completed: bool,
}

#[derive(Debug, Error)]
pub enum TaskStoreError {
    #[error("Task name cannot be empty")]
    EmptyName,

    #[error("Task already exists: {0}")]
    DuplicateName(String),

    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("No task ids left to assign")]
    IdSpaceExhausted,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Persisted id high-water mark, so deleted ids are never handed out again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSequence {
    pub last_id: u64,
}

/// The full task list plus its id sequence. All mutation rules live here so
/// every backend applies them identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
    last_id: u64,
}

impl TaskList {
    pub fn new(tasks: Vec<Task>, sequence: TaskSequence) -> Self {
        Self {
            tasks,
            last_id: sequence.last_id,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn sequence(&self) -> TaskSequence {
        TaskSequence {
            last_id: self.last_id,
        }
    }

    fn next_id(&self) -> Result<TaskId, TaskStoreError> {
        let max_existing = self.tasks.iter().map(|t| t.id.value()).max().unwrap_or(0);
        max_existing
            .max(self.last_id)
            .checked_add(1)
            .map(TaskId)
            .ok_or(TaskStoreError::IdSpaceExhausted)
    }

    /// Append a task, rejecting empty and case-insensitively duplicate names.
    pub fn add(&mut self, name: &str) -> Result<Task, TaskStoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TaskStoreError::EmptyName);
        }
        let folded = name.to_lowercase();
        if self.tasks.iter().any(|t| t.name.to_lowercase() == folded) {
            return Err(TaskStoreError::DuplicateName(name.to_string()));
        }

        let task = Task {
            id: self.next_id()?,
            name: name.to_string(),
            completed: false,
        };
        self.last_id = task.id.value();
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn set_completed(&mut self, id: TaskId, completed: bool) -> Result<(), TaskStoreError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskStoreError::NotFound(id))?;
        task.completed = completed;
        Ok(())
    }

    /// Remove every task with `id`. Returns how many were removed.
    pub fn delete(&mut self, id: TaskId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        before - self.tasks.len()
    }
}

/// Task store trait - implemented by all storage backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Add a task with the next free id.
    async fn add_task(&self, name: &str) -> Result<Task, TaskStoreError>;

    /// All tasks in insertion order. Never fails: unreadable state is empty.
    async fn list_tasks(&self) -> Vec<Task>;

    /// Set the completed flag of one task.
    async fn set_completed(&self, id: TaskId, completed: bool) -> Result<(), TaskStoreError>;

    /// Delete a task. Deleting an unknown id succeeds.
    async fn delete_task(&self, id: TaskId) -> Result<(), TaskStoreError>;

    /// Tasks that are not yet completed, in insertion order.
    async fn list_pending(&self) -> Vec<Task> {
        self.list_tasks()
            .await
            .into_iter()
            .filter(|t| !t.completed)
            .collect()
    }
}

/// Create a task store based on type and configuration.
pub fn create_task_store(
    store_type: StoreType,
    data_dir: PathBuf,
    pretty_json: bool,
) -> Box<dyn TaskStore> {
    match store_type {
        StoreType::Memory => Box::new(InMemoryTaskStore::new()),
        StoreType::File => Box::new(FileTaskStore::new(data_dir).with_pretty(pretty_json)),
    }
}
