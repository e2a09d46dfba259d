use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use ulid::Ulid;

use super::{StoreError, StoreResult, TaskStore};
use crate::model::{Task, TaskDraft};

/// Process-local store. Lists newest documents first, like [`super::SqliteStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            documents: Mutex::new(tasks),
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.documents.lock().clone()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Task>> {
        Ok(self.snapshot())
    }

    async fn create(&self, draft: &TaskDraft) -> StoreResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: Ulid::new().to_string(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            priority: draft.priority,
            category: draft.category,
            due_at: draft.due_at,
            completed: draft.completed,
            created_at: now,
            updated_at: now,
        };
        self.documents.lock().insert(0, task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, changes: &TaskDraft) -> StoreResult<Task> {
        let mut documents = self.documents.lock();
        let task = documents
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        task.title = changes.title.clone();
        task.description = changes.description.clone();
        task.priority = changes.priority;
        task.category = changes.category;
        task.due_at = changes.due_at;
        task.completed = changes.completed;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut documents = self.documents.lock();
        let before = documents.len();
        documents.retain(|task| task.id != id);
        if documents.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
