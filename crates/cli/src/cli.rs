use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::filters::{DueBucket, Facet, FilterState, StatusFilter};
use crate::core::model::{Category, Priority};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskmaster",
    version,
    about = "Manage the todo collection behind the portfolio dashboard.",
    after_help = "Examples:\n  taskmaster list --status active --due overdue\n  taskmaster add Buy milk --priority high --due tomorrow\n  taskmaster toggle 01HV5Z8Q6JQ3W0M1T2N4R7KX9B\n  taskmaster delete 01HV5Z8Q6J... 01HV5Z9A2C..."
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Collection holding the todos (defaults to TASKMASTER_COLLECTION, then "todos")
    #[arg(long, value_name = "NAME", global = true)]
    pub collection: Option<String>,

    /// Override the tracing filter (e.g. "info", "debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Show todos matching the given filters
    List(ListArgs),
    /// Add a todo
    Add(AddArgs),
    /// Replace the fields of an existing todo
    Edit(EditArgs),
    /// Flip a todo between active and completed
    Toggle(ToggleArgs),
    /// Delete one or more todos by id
    Delete(DeleteArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// all, active or completed
    #[arg(long, value_name = "STATUS", default_value = "all")]
    pub status: StatusFilter,

    /// Low, Medium, High or all
    #[arg(long, value_name = "PRIORITY", default_value = "all")]
    pub priority: Facet<Priority>,

    /// Worship, Work, Personality, Programming, Health, Other or all
    #[arg(long, value_name = "CATEGORY", default_value = "all")]
    pub category: Facet<Category>,

    /// all, overdue, today, upcoming or no-due-date
    #[arg(long, value_name = "BUCKET", default_value = "all")]
    pub due: DueBucket,

    /// Case-insensitive text matched against title and description
    #[arg(long, short = 'q', value_name = "TEXT")]
    pub search: Option<String>,

    /// Print matching todos as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub fn filters(&self) -> FilterState {
        FilterState {
            status: self.status,
            priority: self.priority,
            category: self.category,
            due: self.due,
            query: self.search.clone().unwrap_or_default(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Todo title
    #[arg(value_name = "TITLE", required = true)]
    pub title: Vec<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_enum, ignore_case = true)]
    pub priority: Option<Priority>,

    #[arg(long, value_enum, ignore_case = true)]
    pub category: Option<Category>,

    /// Due date (2025-12-24, today, tomorrow, +3d, fri)
    #[arg(long = "due", value_name = "DATE")]
    pub due_at: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_enum, ignore_case = true)]
    pub priority: Option<Priority>,

    #[arg(long, value_enum, ignore_case = true)]
    pub category: Option<Category>,

    /// New due date (2025-12-24, today, tomorrow, +3d, fri)
    #[arg(long = "due", value_name = "DATE", conflicts_with = "clear_due")]
    pub due_at: Option<String>,

    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ToggleArgs {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more todo ids to delete
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}
