pub mod config;
pub mod dates;
pub mod filters;
pub mod model;
pub mod notify;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use filters::{DueBucket, DueWindow, Facet, FilterState, StatusCounts, StatusFilter};
pub use model::*;
pub use notify::{Notification, NotificationKind, Notifications};
pub use services::{LoadState, TodoController, TodoError, TodoSnapshot};
pub use store::{MemoryStore, SqliteStore, StoreError, TaskStore};
