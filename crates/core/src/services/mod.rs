mod state;
mod todos;

pub use state::{LoadState, TodoSnapshot, TodoState};
pub use todos::{TodoController, TodoError};
