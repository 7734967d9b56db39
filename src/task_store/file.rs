//! JSON file-based task store.

use super::{Task, TaskId, TaskList, TaskSequence, TaskStore, TaskStoreError};
use crate::json_file::{DocumentLock, JsonDocument};
use async_trait::async_trait;
use std::path::PathBuf;

pub const TASKS_FILE: &str = "tasks.json";
pub const SEQUENCE_FILE: &str = "task_sequence.json";

#[derive(Debug, Clone)]
pub struct FileTaskStore {
    tasks: JsonDocument<Vec<Task>>,
    sequence: JsonDocument<TaskSequence>,
}

impl FileTaskStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            tasks: JsonDocument::new(data_dir.join(TASKS_FILE)),
            sequence: JsonDocument::new(data_dir.join(SEQUENCE_FILE)),
        }
    }

    pub fn with_pretty(self, pretty: bool) -> Self {
        Self {
            tasks: self.tasks.with_pretty(pretty),
            sequence: self.sequence.with_pretty(pretty),
        }
    }

    fn load(&self) -> TaskList {
        TaskList::new(self.tasks.load(), self.sequence.load())
    }

    /// Lock, load, apply `f`, and write the list back if `f` succeeds.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut TaskList) -> Result<R, TaskStoreError>,
    ) -> Result<R, TaskStoreError> {
        let lock = self.tasks.lock()?;
        let mut list = self.load();
        let before = list.sequence();
        let result = f(&mut list)?;
        self.persist(&lock, &list, before)?;
        Ok(result)
    }

    fn persist(
        &self,
        tasks_lock: &DocumentLock,
        list: &TaskList,
        previous_sequence: TaskSequence,
    ) -> Result<(), TaskStoreError> {
        // The sequence goes first: a failure after it only leaves a gap in ids.
        if list.sequence() != previous_sequence {
            let seq_lock = self.sequence.lock()?;
            self.sequence.write(&seq_lock, &list.sequence())?;
        }
        self.tasks.write(tasks_lock, &list.tasks().to_vec())?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn add_task(&self, name: &str) -> Result<Task, TaskStoreError> {
        match self.mutate(|list| list.add(name)) {
            Ok(task) => {
                tracing::info!("Added task {}: {}", task.id, task.name);
                Ok(task)
            }
            Err(e) => {
                tracing::info!("Rejected task {:?}: {}", name, e);
                Err(e)
            }
        }
    }

    async fn list_tasks(&self) -> Vec<Task> {
        self.tasks.load()
    }

    async fn set_completed(&self, id: TaskId, completed: bool) -> Result<(), TaskStoreError> {
        self.mutate(|list| list.set_completed(id, completed))
            .map_err(|e| {
                tracing::warn!("Failed to update task {}: {}", id, e);
                e
            })?;
        tracing::info!("Updated task {}, completed: {}", id, completed);
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), TaskStoreError> {
        let removed = self.mutate(|list| Ok(list.delete(id)))?;
        tracing::info!("Deleted task {} ({} removed)", id, removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileTaskStore) {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileTaskStore::new(temp.path().to_path_buf());
        (temp, store)
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let (_temp, store) = store();
        assert!(store.list_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn tasks_round_trip_through_disk() {
        let (temp, store) = store();
        let a = store.add_task("Write report").await.unwrap();
        let b = store.add_task("Call plumber").await.unwrap();
        store.set_completed(a.id, true).await.unwrap();

        let reopened = FileTaskStore::new(temp.path().to_path_buf());
        let tasks = reopened.list_tasks().await;
        assert_eq!(
            tasks,
            vec![
                Task {
                    id: a.id,
                    name: "Write report".to_string(),
                    completed: true
                },
                Task {
                    id: b.id,
                    name: "Call plumber".to_string(),
                    completed: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn document_uses_string_ids() {
        let (temp, store) = store();
        store.add_task("A").await.unwrap();

        let raw = std::fs::read_to_string(temp.path().join(TASKS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "id": "1", "name": "A", "completed": false }])
        );
    }

    #[tokio::test]
    async fn duplicate_name_in_other_case_leaves_file_unchanged() {
        let (temp, store) = store();
        store.add_task("Groceries").await.unwrap();
        let before = std::fs::read(temp.path().join(TASKS_FILE)).unwrap();

        let err = store.add_task("GROCERIES").await.unwrap_err();
        assert!(matches!(err, TaskStoreError::DuplicateName(_)));
        assert_eq!(std::fs::read(temp.path().join(TASKS_FILE)).unwrap(), before);
    }

    #[tokio::test]
    async fn ids_survive_deletion_and_reopen() {
        let (temp, store) = store();
        let a = store.add_task("A").await.unwrap();
        store.delete_task(a.id).await.unwrap();

        let reopened = FileTaskStore::new(temp.path().to_path_buf());
        let b = reopened.add_task("B").await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn set_completed_on_missing_id_fails_without_writing() {
        let (temp, store) = store();
        let a = store.add_task("A").await.unwrap();
        let before = std::fs::read(temp.path().join(TASKS_FILE)).unwrap();

        let err = store.set_completed(TaskId::new(77), true).await.unwrap_err();
        assert!(matches!(err, TaskStoreError::NotFound(id) if id == TaskId::new(77)));
        assert_eq!(std::fs::read(temp.path().join(TASKS_FILE)).unwrap(), before);

        store.set_completed(a.id, true).await.unwrap();
        store.set_completed(a.id, false).await.unwrap();
        assert!(!store.list_tasks().await[0].completed);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_temp, store) = store();
        let a = store.add_task("A").await.unwrap();
        store.add_task("B").await.unwrap();

        store.delete_task(a.id).await.unwrap();
        store.delete_task(a.id).await.unwrap();
        let names: Vec<_> = store.list_tasks().await.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_document_lists_empty() {
        let (temp, store) = store();
        std::fs::write(temp.path().join(TASKS_FILE), b"[{\"id\": ").unwrap();
        assert!(store.list_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn max_stored_id_refuses_new_tasks() {
        let (temp, store) = store();
        let path = temp.path().join(TASKS_FILE);
        let original = br#"[{"id":"18446744073709551615","name":"Last","completed":false}]"#;
        std::fs::write(&path, original).unwrap();
        assert_eq!(store.list_tasks().await.len(), 1);

        let err = store.add_task("New").await.unwrap_err();
        assert!(matches!(err, TaskStoreError::IdSpaceExhausted));
        assert_eq!(std::fs::read(&path).unwrap(), original.to_vec());
        assert!(!temp.path().join(SEQUENCE_FILE).exists());
    }

    #[tokio::test]
    async fn list_pending_skips_completed() {
        let (_temp, store) = store();
        let a = store.add_task("A").await.unwrap();
        store.add_task("B").await.unwrap();
        store.set_completed(a.id, true).await.unwrap();

        let pending: Vec<_> = store.list_pending().await.into_iter().map(|t| t.name).collect();
        assert_eq!(pending, vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn write_fails_while_another_writer_holds_the_lock() {
        let (temp, store) = store();
        let doc: JsonDocument<Vec<Task>> = JsonDocument::new(temp.path().join(TASKS_FILE));
        let _held = doc.lock().unwrap();

        let err = store.add_task("A").await.unwrap_err();
        assert!(matches!(err, TaskStoreError::Storage(_)));
    }
}
