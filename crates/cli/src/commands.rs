use std::fmt;
use std::io::Write;

use anyhow::{anyhow, Result};
use chrono::Local;

use crate::cli::{AddArgs, CliCommand, DeleteArgs, EditArgs, ListArgs, ToggleArgs};
use crate::config::AppConfig;
use crate::core::dates::parse_due;
use crate::core::filters::DueWindow;
use crate::core::model::{Task, TaskDraft};
use crate::core::notify::Notification;
use crate::core::services::{LoadState, TodoController, TodoError};
use crate::core::store::{SqliteStore, TaskStore};

pub async fn execute<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    let controller = TodoController::new(SqliteStore::new(config.clone()));
    execute_with(&controller, command, &mut writer).await
}

/// Load the collection, run `command` against it, then print any
/// notifications the controller raised along the way.
pub async fn execute_with<S: TaskStore, W: Write>(
    controller: &TodoController<S>,
    command: CliCommand,
    mut writer: W,
) -> Result<()> {
    let outcome = run(controller, command, &mut writer).await;
    for notification in controller.notifications().drain() {
        writeln!(writer, "{}", NoticeLine(&notification))?;
    }
    outcome
}

async fn run<S: TaskStore, W: Write>(
    controller: &TodoController<S>,
    command: CliCommand,
    mut writer: W,
) -> Result<()> {
    controller.load().await?;
    if let LoadState::Misconfigured(reason) = controller.load_state() {
        return Err(anyhow!("{}", reason));
    }

    match command {
        CliCommand::List(args) => handle_list(controller, &args, &mut writer),
        CliCommand::Add(args) => handle_add(controller, &args, &mut writer).await,
        CliCommand::Edit(args) => handle_edit(controller, &args, &mut writer).await,
        CliCommand::Toggle(args) => handle_toggle(controller, &args, &mut writer).await,
        CliCommand::Delete(args) => handle_delete(controller, &args, &mut writer).await,
    }
}

fn handle_list<S: TaskStore, W: Write>(
    controller: &TodoController<S>,
    args: &ListArgs,
    mut writer: W,
) -> Result<()> {
    controller.set_filters(args.filters());
    let window = DueWindow::current();
    let snapshot = controller.snapshot(&window);

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&snapshot.tasks)?)?;
        return Ok(());
    }

    if snapshot.is_empty() {
        writeln!(writer, "No todos found")?;
    }
    for task in &snapshot.tasks {
        writeln!(writer, "{}", TaskLine::new(task, &window))?;
    }
    if let Some(summary) = snapshot.filters.summary() {
        writeln!(writer, "Filters: {}", summary)?;
    }
    writeln!(
        writer,
        "{} of {} todos shown ({} active, {} completed)",
        snapshot.tasks.len(),
        snapshot.counts.all,
        snapshot.counts.active,
        snapshot.counts.completed
    )?;
    Ok(())
}

async fn handle_add<S: TaskStore, W: Write>(
    controller: &TodoController<S>,
    args: &AddArgs,
    mut writer: W,
) -> Result<()> {
    let draft = TaskDraft {
        title: args.title.join(" "),
        description: args.description.clone().unwrap_or_default(),
        priority: args.priority.unwrap_or_default(),
        category: args.category.unwrap_or_default(),
        due_at: args.due_at.as_deref().map(parse_due).transpose()?,
        completed: false,
    };
    let task = controller.add(&draft).await?;
    writeln!(writer, "{}", TaskLine::new(&task, &DueWindow::current()))?;
    Ok(())
}

async fn handle_edit<S: TaskStore, W: Write>(
    controller: &TodoController<S>,
    args: &EditArgs,
    mut writer: W,
) -> Result<()> {
    let current = controller
        .task(&args.id)
        .ok_or_else(|| TodoError::UnknownTask(args.id.clone()))?;

    let mut draft = TaskDraft::from(&current);
    if let Some(title) = &args.title {
        draft.title = title.clone();
    }
    if let Some(description) = &args.description {
        draft.description = description.clone();
    }
    if let Some(priority) = args.priority {
        draft.priority = priority;
    }
    if let Some(category) = args.category {
        draft.category = category;
    }
    if args.clear_due {
        draft.due_at = None;
    } else if let Some(spec) = &args.due_at {
        draft.due_at = Some(parse_due(spec)?);
    }

    let task = controller.edit(&args.id, &draft).await?;
    writeln!(writer, "{}", TaskLine::new(&task, &DueWindow::current()))?;
    Ok(())
}

async fn handle_toggle<S: TaskStore, W: Write>(
    controller: &TodoController<S>,
    args: &ToggleArgs,
    mut writer: W,
) -> Result<()> {
    let completed = controller.toggle_complete(&args.id).await?;
    writeln!(
        writer,
        "Marked {} as {}",
        args.id,
        if completed { "completed" } else { "active" }
    )?;
    Ok(())
}

async fn handle_delete<S: TaskStore, W: Write>(
    controller: &TodoController<S>,
    args: &DeleteArgs,
    mut writer: W,
) -> Result<()> {
    let mut summary = DeleteSummary::default();
    let mut failure = None;
    for id in &args.ids {
        if let Err(err) = summary.record(controller.delete(id).await) {
            failure = Some(err);
            break;
        }
    }
    writeln!(writer, "{}", summary)?;
    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Outcome of a multi-id delete. Unknown ids are collected; any other error
/// is handed back so the run can stop.
#[derive(Default)]
struct DeleteSummary {
    deleted: usize,
    missing: Vec<String>,
}

impl DeleteSummary {
    fn record(&mut self, outcome: Result<(), TodoError>) -> Result<(), TodoError> {
        match outcome {
            Ok(()) => self.deleted += 1,
            Err(TodoError::UnknownTask(id)) => self.missing.push(id),
            Err(err) => return Err(err),
        }
        Ok(())
    }
}

impl fmt::Display for DeleteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.deleted {
            0 => write!(f, "No todos deleted")?,
            1 => write!(f, "Deleted 1 todo")?,
            count => write!(f, "Deleted {} todos", count)?,
        }
        if !self.missing.is_empty() {
            write!(f, "\nNot found: {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}

struct TaskLine<'a> {
    task: &'a Task,
    overdue: bool,
}

impl<'a> TaskLine<'a> {
    fn new(task: &'a Task, window: &DueWindow) -> Self {
        let overdue = !task.completed && task.due_at.is_some_and(|due| window.is_overdue(due));
        Self { task, overdue }
    }
}

impl fmt::Display for TaskLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.task;
        write!(
            f,
            "[{}] {}  {}  ({}, {}",
            if task.completed { "x" } else { " " },
            task.id,
            task.title,
            task.priority,
            task.category
        )?;
        if let Some(due) = task.due_at {
            write!(f, ", due {}", due.with_timezone(&Local).format("%Y-%m-%d"))?;
        }
        if self.overdue {
            write!(f, ", overdue")?;
        }
        write!(f, ")")
    }
}

struct NoticeLine<'a>(&'a Notification);

impl fmt::Display for NoticeLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0.title, self.0.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    fn temp_config() -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        (config, dir)
    }

    async fn run_cli(config: &AppConfig, args: &[&str]) -> (Result<()>, String) {
        let cli = Cli::try_parse_from(std::iter::once("taskmaster").chain(args.iter().copied()))
            .expect("parse args");
        let mut output = Vec::new();
        let result = execute(config, cli.command, &mut output).await;
        (result, String::from_utf8(output).expect("utf8"))
    }

    async fn stored(config: &AppConfig) -> Vec<Task> {
        SqliteStore::new(config.clone()).list().await.expect("list")
    }

    #[tokio::test]
    async fn add_then_list_shows_task_and_counts() {
        let (config, _dir) = temp_config();
        let (result, output) = run_cli(
            &config,
            &["add", "Buy", "milk", "--priority", "high", "--category", "health"],
        )
        .await;
        result.expect("add");
        assert!(output.contains("Buy milk  (High, Health)"));
        assert!(output.contains("Todo added: Your todo has been successfully added."));

        let (result, output) = run_cli(&config, &["list"]).await;
        result.expect("list");
        assert!(output.contains("[ ] "));
        assert!(output.contains("Buy milk"));
        assert!(output.contains("1 of 1 todos shown (1 active, 0 completed)"));
    }

    #[tokio::test]
    async fn list_reports_filters_and_empty_result() {
        let (config, _dir) = temp_config();
        run_cli(&config, &["add", "Buy", "milk"]).await.0.expect("add");

        let (result, output) = run_cli(&config, &["list", "--search", "eggs"]).await;
        result.expect("list");
        assert!(output.contains("No todos found"));
        assert!(output.contains("Filters: q:\"eggs\""));
        assert!(output.contains("0 of 1 todos shown"));
    }

    #[tokio::test]
    async fn list_json_prints_store_spelling() {
        let (config, _dir) = temp_config();
        run_cli(&config, &["add", "Pray", "--category", "worship", "--due", "2030-01-15"])
            .await
            .0
            .expect("add");

        let (result, output) = run_cli(&config, &["list", "--json"]).await;
        result.expect("list");
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        let tasks = value.as_array().expect("array");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["title"], "Pray");
        assert_eq!(tasks[0]["category"], "Worship");
        assert!(tasks[0]["dueAt"].is_string());
        assert_eq!(tasks[0]["completed"], false);
    }

    #[tokio::test]
    async fn toggle_and_edit_persist_changes() {
        let (config, _dir) = temp_config();
        run_cli(&config, &["add", "Draft", "--due", "2030-01-15"])
            .await
            .0
            .expect("add");
        let id = stored(&config).await[0].id.clone();

        let (result, output) = run_cli(&config, &["toggle", &id]).await;
        result.expect("toggle");
        assert_eq!(output, format!("Marked {} as completed\n", id));

        let (result, _) = run_cli(
            &config,
            &["edit", &id, "--title", "Final", "--category", "Work", "--clear-due"],
        )
        .await;
        result.expect("edit");

        let task = stored(&config).await.remove(0);
        assert_eq!(task.title, "Final");
        assert_eq!(task.category.as_str(), "Work");
        assert!(task.due_at.is_none());
        assert!(task.completed);
    }

    #[tokio::test]
    async fn empty_title_fails_without_writing() {
        let (config, _dir) = temp_config();
        let (result, output) = run_cli(&config, &["add", "   "]).await;
        let err = result.expect_err("blank title");
        assert_eq!(err.to_string(), "Title is required");
        assert!(output.is_empty());
        assert!(stored(&config).await.is_empty());
    }

    #[rstest]
    #[case(1, &["missing"], "Deleted 1 todo\nNot found: missing\n")]
    #[case(2, &[], "Deleted 2 todos\n")]
    #[case(0, &["gone", "missing"], "No todos deleted\nNot found: gone, missing\n")]
    #[tokio::test]
    async fn delete_summarizes_deleted_and_missing(
        #[case] seeded: usize,
        #[case] unknown: &[&str],
        #[case] expected: &str,
    ) {
        let (config, _dir) = temp_config();
        for n in 0..seeded {
            run_cli(&config, &["add", &format!("Temporary {n}")])
                .await
                .0
                .expect("add");
        }
        let mut ids: Vec<String> = stored(&config).await.into_iter().map(|t| t.id).collect();
        ids.extend(unknown.iter().map(|id| id.to_string()));

        let mut args = vec!["delete"];
        args.extend(ids.iter().map(String::as_str));
        let (result, output) = run_cli(&config, &args).await;
        result.expect("delete");
        assert!(output.starts_with(expected), "unexpected output: {output}");
        assert!(stored(&config).await.is_empty());
    }

    #[tokio::test]
    async fn invalid_collection_fails_before_touching_disk() {
        let (config, dir) = temp_config();
        let config = config.with_collection("not valid");
        let (result, _) = run_cli(&config, &["list"]).await;
        let err = result.expect_err("misconfigured");
        assert!(err.to_string().contains("collection name"));
        assert!(!dir.path().join("taskmaster.sqlite3").exists());
    }
}
