//! The controller's view state: the loaded collection plus the active filters.
//!
//! Reconciliation after a successful store call is expressed as plain methods
//! keyed by task id, so the rules can be checked without a store.

use crate::filters::{DueWindow, FilterState, StatusCounts};
use crate::model::Task;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Failed(String),
    /// The store refused to start; the collection is shown empty.
    Misconfigured(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TodoState {
    pub tasks: Vec<Task>,
    pub filters: FilterState,
    pub load_state: LoadState,
}

impl TodoState {
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn prepend(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    /// Swap in the stored version of a task. Returns false if the id is unknown.
    pub fn replace(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => {
                *existing = task;
                true
            }
            None => false,
        }
    }

    /// Returns false if the id is unknown.
    pub fn set_completed(&mut self, id: &str, completed: bool) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.completed = completed;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    pub fn visible(&self, window: &DueWindow) -> Vec<Task> {
        self.filters
            .apply(&self.tasks, window)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn snapshot(&self, window: &DueWindow) -> TodoSnapshot {
        TodoSnapshot {
            filters: self.filters.clone(),
            tasks: self.visible(window),
            counts: StatusCounts::from_tasks(&self.tasks),
            load_state: self.load_state.clone(),
        }
    }
}

/// What a front end renders: the filtered list and the context around it.
#[derive(Debug, Clone)]
pub struct TodoSnapshot {
    pub filters: FilterState,
    pub tasks: Vec<Task>,
    pub counts: StatusCounts,
    pub load_state: LoadState,
}

impl TodoSnapshot {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::StatusFilter;
    use crate::model::{Category, Priority};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn task(id: &str, completed: bool) -> Task {
        let now = Utc::now();
        Task {
            id: id.into(),
            title: format!("task {id}"),
            description: String::new(),
            priority: Priority::Medium,
            category: Category::Programming,
            due_at: None,
            completed,
            created_at: now,
            updated_at: now,
        }
    }

    fn state() -> TodoState {
        TodoState {
            tasks: vec![task("a", false), task("b", true)],
            ..TodoState::default()
        }
    }

    #[test]
    fn prepend_puts_new_task_first() {
        let mut state = state();
        state.prepend(task("c", false));
        let ids: Vec<&str> = state.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn replace_matches_by_id_only() {
        let mut state = state();
        let mut edited = task("b", true);
        edited.title = "renamed".into();
        assert!(state.replace(edited));
        assert_eq!(state.find("b").unwrap().title, "renamed");
        assert!(!state.replace(task("zzz", false)));
        assert_eq!(state.tasks.len(), 2);
    }

    #[test]
    fn set_completed_is_idempotent_and_reversible() {
        let mut state = state();
        let before = state.tasks.clone();
        assert!(state.set_completed("a", true));
        assert!(state.set_completed("a", true));
        assert!(state.find("a").unwrap().completed);
        assert!(state.set_completed("a", false));
        assert_eq!(state.tasks, before);
        assert!(!state.set_completed("missing", true));
    }

    #[test]
    fn remove_drops_matching_task() {
        let mut state = state();
        assert!(state.remove("a"));
        assert!(!state.remove("a"));
        assert_eq!(state.tasks.len(), 1);
    }

    #[test]
    fn snapshot_filters_tasks_but_counts_everything() {
        let mut state = state();
        state.filters.status = StatusFilter::Completed;
        let snapshot = state.snapshot(&DueWindow::current());
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.tasks[0].id, "b");
        assert_eq!(snapshot.counts.all, 2);
        assert_eq!(snapshot.counts.active, 1);
    }
}
