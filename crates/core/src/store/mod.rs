//! Document-store seam for the todo collection.
//!
//! The controller only talks to a [`TaskStore`]; the hosted document database
//! of a deployment and the local stores shipped here all sit behind it.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::model::{Task, TaskDraft};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store cannot be used with the current configuration. Detected
    /// before any request is attempted.
    #[error("store is not configured: {0}")]
    Misconfigured(String),
    #[error("task {0} was not found")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Verify configuration without issuing a request.
    fn check_ready(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Task>>;

    async fn create(&self, draft: &TaskDraft) -> StoreResult<Task>;

    async fn update(&self, id: &str, changes: &TaskDraft) -> StoreResult<Task>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
impl<S: TaskStore + ?Sized> TaskStore for std::sync::Arc<S> {
    fn check_ready(&self) -> StoreResult<()> {
        (**self).check_ready()
    }

    async fn list(&self) -> StoreResult<Vec<Task>> {
        (**self).list().await
    }

    async fn create(&self, draft: &TaskDraft) -> StoreResult<Task> {
        (**self).create(draft).await
    }

    async fn update(&self, id: &str, changes: &TaskDraft) -> StoreResult<Task> {
        (**self).update(id, changes).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        (**self).delete(id).await
    }
}
