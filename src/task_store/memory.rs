//! In-memory task store (non-persistent).

use super::{Task, TaskId, TaskList, TaskStore, TaskStoreError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    list: Arc<RwLock<TaskList>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn add_task(&self, name: &str) -> Result<Task, TaskStoreError> {
        self.list.write().await.add(name)
    }

    async fn list_tasks(&self) -> Vec<Task> {
        self.list.read().await.tasks().to_vec()
    }

    async fn set_completed(&self, id: TaskId, completed: bool) -> Result<(), TaskStoreError> {
        self.list.write().await.set_completed(id, completed)
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), TaskStoreError> {
        self.list.write().await.delete(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_is_not_persistent() {
        let store = InMemoryTaskStore::new();
        assert!(!store.is_persistent());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryTaskStore::new();
        let other = store.clone();
        store.add_task("Shared").await.unwrap();

        assert_eq!(other.list_tasks().await.len(), 1);
        assert!(matches!(
            other.add_task("shared").await,
            Err(TaskStoreError::DuplicateName(_))
        ));
    }
}
