use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::state::{LoadState, TodoSnapshot, TodoState};
use crate::filters::{DueWindow, FilterState};
use crate::model::{Task, TaskDraft, ValidationError};
use crate::notify::{Notification, Notifications};
use crate::store::{StoreError, TaskStore};

const ADD_FAILED: &str = "Error adding todo";
const UPDATE_FAILED: &str = "Error updating todo";
const DELETE_FAILED: &str = "Error deleting todo";
const LOAD_FAILED: &str = "Error loading todos";

#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("task {0} is not in the loaded collection")]
    UnknownTask(String),
    #[error("task {0} already has a change in flight")]
    Busy(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the loaded todo collection and filter state, and applies mutations
/// through the injected store.
///
/// The collection only changes after the store confirms an operation. A
/// failed call leaves it exactly as it was and records an error
/// notification. Edits, toggles and deletes of a task that already has a
/// pending change are rejected with [`TodoError::Busy`].
pub struct TodoController<S> {
    store: S,
    state: Mutex<TodoState>,
    in_flight: Mutex<HashSet<String>>,
    notifications: Arc<Notifications>,
}

impl<S: TaskStore> TodoController<S> {
    pub fn new(store: S) -> Self {
        Self::with_notifications(store, Arc::new(Notifications::new()))
    }

    pub fn with_notifications(store: S, notifications: Arc<Notifications>) -> Self {
        Self {
            store,
            state: Mutex::new(TodoState::default()),
            in_flight: Mutex::new(HashSet::new()),
            notifications,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifications(&self) -> &Arc<Notifications> {
        &self.notifications
    }

    /// Replace the collection with the store's current contents.
    ///
    /// A misconfigured store is not an error here: the collection is emptied
    /// and the load state explains why. Returns the number of tasks loaded.
    pub async fn load(&self) -> Result<usize, TodoError> {
        if let Err(err) = self.store.check_ready() {
            tracing::warn!(error = %err, "todo store is not configured");
            let mut state = self.state.lock();
            state.tasks.clear();
            state.load_state = LoadState::Misconfigured(err.to_string());
            return Ok(0);
        }

        self.state.lock().load_state = LoadState::Loading;
        match self.store.list().await {
            Ok(tasks) => {
                let count = tasks.len();
                let mut state = self.state.lock();
                state.tasks = tasks;
                state.load_state = LoadState::Idle;
                tracing::debug!(count, "todos loaded");
                Ok(count)
            }
            Err(err) => {
                self.state.lock().load_state = LoadState::Failed(err.to_string());
                self.report_failure(
                    LOAD_FAILED,
                    "Could not load your todos. Please try again later.",
                    &err,
                );
                Err(err.into())
            }
        }
    }

    pub async fn add(&self, draft: &TaskDraft) -> Result<Task, TodoError> {
        let draft = draft.normalized()?;
        self.ensure_ready(ADD_FAILED)?;

        match self.store.create(&draft).await {
            Ok(task) => {
                self.state.lock().prepend(task.clone());
                tracing::debug!(task_id = task.id.as_str(), "todo added");
                self.notifications.push(Notification::info(
                    "Todo added",
                    "Your todo has been successfully added.",
                ));
                Ok(task)
            }
            Err(err) => {
                self.report_failure(ADD_FAILED, "Could not add your todo. Please try again.", &err);
                Err(err.into())
            }
        }
    }

    /// Send every client-mutable field of `draft` for the task `id` and adopt
    /// the stored result.
    pub async fn edit(&self, id: &str, draft: &TaskDraft) -> Result<Task, TodoError> {
        let draft = draft.normalized()?;
        self.require_loaded(id)?;
        let _guard = self.begin(id)?;
        self.ensure_ready(UPDATE_FAILED)?;

        match self.store.update(id, &draft).await {
            Ok(task) => {
                self.state.lock().replace(task.clone());
                tracing::debug!(task_id = id, "todo updated");
                self.notifications.push(Notification::info(
                    "Todo updated",
                    "Your todo has been successfully updated.",
                ));
                Ok(task)
            }
            Err(err) => {
                self.report_failure(
                    UPDATE_FAILED,
                    "Could not update your todo. Please try again.",
                    &err,
                );
                Err(err.into())
            }
        }
    }

    /// Invert the completion flag. Returns the flag now held locally.
    ///
    /// On success the local flag becomes the inverse of the flag the task had
    /// when the toggle started. The store's reply is ignored, and so is any
    /// reload that lands while the call is pending.
    pub async fn toggle_complete(&self, id: &str) -> Result<bool, TodoError> {
        let current = self.require_loaded(id)?;
        let _guard = self.begin(id)?;
        self.ensure_ready(UPDATE_FAILED)?;

        let mut changes = TaskDraft::from(&current);
        changes.completed = !current.completed;

        match self.store.update(id, &changes).await {
            Ok(_) => {
                let completed = changes.completed;
                self.state.lock().set_completed(id, completed);
                tracing::debug!(task_id = id, completed, "todo toggled");
                Ok(completed)
            }
            Err(err) => {
                self.report_failure(
                    UPDATE_FAILED,
                    "Could not update your todo status. Please try again.",
                    &err,
                );
                Err(err.into())
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), TodoError> {
        self.require_loaded(id)?;
        let _guard = self.begin(id)?;
        self.ensure_ready(DELETE_FAILED)?;

        match self.store.delete(id).await {
            Ok(()) => {
                self.state.lock().remove(id);
                tracing::debug!(task_id = id, "todo deleted");
                self.notifications.push(Notification::info(
                    "Todo deleted",
                    "Your todo has been successfully deleted.",
                ));
                Ok(())
            }
            Err(err) => {
                self.report_failure(
                    DELETE_FAILED,
                    "Could not delete your todo. Please try again.",
                    &err,
                );
                Err(err.into())
            }
        }
    }

    pub fn filters(&self) -> FilterState {
        self.state.lock().filters.clone()
    }

    pub fn set_filters(&self, filters: FilterState) {
        self.state.lock().filters = filters;
    }

    pub fn update_filters(&self, f: impl FnOnce(&mut FilterState)) {
        f(&mut self.state.lock().filters);
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.state.lock().filters.query = query.into();
    }

    pub fn reset_filters(&self) {
        self.state.lock().filters.reset();
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.state.lock().find(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    pub fn load_state(&self) -> LoadState {
        self.state.lock().load_state.clone()
    }

    /// Tasks passing the current filters.
    pub fn visible(&self, window: &DueWindow) -> Vec<Task> {
        self.state.lock().visible(window)
    }

    pub fn snapshot(&self, window: &DueWindow) -> TodoSnapshot {
        self.state.lock().snapshot(window)
    }

    /// Whether a change to `id` is waiting on the store, so a front end can
    /// disable that row's controls.
    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.lock().contains(id)
    }

    fn require_loaded(&self, id: &str) -> Result<Task, TodoError> {
        self.state
            .lock()
            .find(id)
            .cloned()
            .ok_or_else(|| TodoError::UnknownTask(id.to_string()))
    }

    fn ensure_ready(&self, failure_title: &str) -> Result<(), TodoError> {
        if let Err(err) = self.store.check_ready() {
            self.report_failure(failure_title, &err.to_string(), &err);
            return Err(err.into());
        }
        Ok(())
    }

    fn begin(&self, id: &str) -> Result<InFlight<'_>, TodoError> {
        if !self.in_flight.lock().insert(id.to_string()) {
            tracing::debug!(task_id = id, "rejecting overlapping change");
            return Err(TodoError::Busy(id.to_string()));
        }
        Ok(InFlight {
            ids: &self.in_flight,
            id: id.to_string(),
        })
    }

    fn report_failure(&self, title: &str, description: &str, err: &StoreError) {
        tracing::warn!(error = %err, "{}", title);
        self.notifications
            .push(Notification::error(title, description));
    }
}

/// Marks a task id busy until dropped.
struct InFlight<'a> {
    ids: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.ids.lock().remove(&self.id);
    }
}
