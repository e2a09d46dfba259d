use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{named_params, Connection, Row};
use ulid::Ulid;

use super::{StoreError, StoreResult, TaskStore};
use crate::config::AppConfig;
use crate::model::{Task, TaskDraft};

/// SQLite-backed document collection. Each call opens its own connection on
/// the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    config: AppConfig,
}

impl SqliteStore {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    async fn with_database<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        self.check_ready()?;
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let db = Database::initialize(&config)
                .map_err(|err| StoreError::Unavailable(format!("{err:#}")))?;
            f(&db)
        })
        .await
        .map_err(|err| StoreError::Unavailable(format!("blocking task failed: {}", err)))?
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    fn check_ready(&self) -> StoreResult<()> {
        match self.config.problem() {
            Some(problem) => Err(StoreError::Misconfigured(problem)),
            None => Ok(()),
        }
    }

    async fn list(&self) -> StoreResult<Vec<Task>> {
        self.with_database(|db| Ok(db.fetch_tasks()?)).await
    }

    async fn create(&self, draft: &TaskDraft) -> StoreResult<Task> {
        let draft = draft.clone();
        self.with_database(move |db| {
            let id = Ulid::new().to_string();
            db.insert_task(&id, &draft)?;
            db.fetch_task(&id)?
                .ok_or_else(|| StoreError::Backend(anyhow!("task {} vanished after insert", id)))
        })
        .await
    }

    async fn update(&self, id: &str, changes: &TaskDraft) -> StoreResult<Task> {
        let id = id.to_string();
        let changes = changes.clone();
        self.with_database(move |db| {
            db.update_task(&id, &changes)?
                .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        self.with_database(move |db| {
            if db.delete_task(&id)? {
                Ok(())
            } else {
                Err(StoreError::NotFound(id))
            }
        })
        .await
    }
}

struct Database {
    conn: Connection,
    collection: String,
    /// Quoted form of `collection`, safe to splice into SQL.
    table: String,
}

impl Database {
    fn initialize(config: &AppConfig) -> Result<Self> {
        let conn = Connection::open(config.db_path()).with_context(|| {
            format!("Failed to open database at {}", config.db_path().display())
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to configure SQLite WAL mode")?;

        let collection = config.collection().to_string();
        let db = Self {
            conn,
            table: format!("\"{}\"", collection),
            collection,
        };
        db.apply_migrations()?;
        Ok(db)
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT id, title, description, priority, category, due_at, completed, created_at, updated_at \
             FROM {} ORDER BY created_at DESC, id DESC",
            self.table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(self.map_task(row)?);
        }
        Ok(tasks)
    }

    fn fetch_task(&self, id: &str) -> Result<Option<Task>> {
        let sql = format!(
            "SELECT id, title, description, priority, category, due_at, completed, created_at, updated_at \
             FROM {} WHERE id = ? LIMIT 1",
            self.table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(self.map_task(row)?))
        } else {
            Ok(None)
        }
    }

    fn insert_task(&self, id: &str, draft: &TaskDraft) -> Result<()> {
        let now = format_timestamp(Utc::now());
        let sql = format!(
            "INSERT INTO {} (
                id, title, description, priority, category, due_at, completed, created_at, updated_at
            ) VALUES (
                :id, :title, :description, :priority, :category, :due_at, :completed, :created_at, :updated_at
            )",
            self.table
        );
        self.conn.execute(
            &sql,
            named_params![
                ":id": id,
                ":title": &draft.title,
                ":description": &draft.description,
                ":priority": draft.priority.as_str(),
                ":category": draft.category.as_str(),
                ":due_at": draft.due_at.map(format_timestamp),
                ":completed": draft.completed,
                ":created_at": &now,
                ":updated_at": &now,
            ],
        )?;
        Ok(())
    }

    fn update_task(&self, id: &str, changes: &TaskDraft) -> Result<Option<Task>> {
        let sql = format!(
            "UPDATE {} SET
                title = :title,
                description = :description,
                priority = :priority,
                category = :category,
                due_at = :due_at,
                completed = :completed,
                updated_at = :updated_at
             WHERE id = :id",
            self.table
        );
        let affected = self.conn.execute(
            &sql,
            named_params![
                ":title": &changes.title,
                ":description": &changes.description,
                ":priority": changes.priority.as_str(),
                ":category": changes.category.as_str(),
                ":due_at": changes.due_at.map(format_timestamp),
                ":completed": changes.completed,
                ":updated_at": format_timestamp(Utc::now()),
                ":id": id,
            ],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        self.fetch_task(id)
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = :id", self.table);
        let affected = self.conn.execute(&sql, named_params![":id": id])?;
        Ok(affected > 0)
    }

    fn map_task(&self, row: &Row<'_>) -> Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            priority: row.get::<_, String>(3)?.parse()?,
            category: row.get::<_, String>(4)?.parse()?,
            due_at: parse_datetime(row.get::<_, Option<String>>(5)?),
            completed: row.get(6)?,
            created_at: parse_datetime_required(row.get::<_, String>(7)?)?,
            updated_at: parse_datetime_required(row.get::<_, String>(8)?)?,
        })
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                priority TEXT NOT NULL DEFAULT 'Medium',
                category TEXT NOT NULL DEFAULT 'Programming',
                due_at TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS \"idx_{collection}_created\" ON {table}(created_at);
            ",
            table = self.table,
            collection = self.collection
        ))?;
        Ok(())
    }
}

/// Fixed-width so that text ordering in SQL matches time ordering.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_datetime(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_datetime_required(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("Failed to parse timestamp '{}': {}", raw, e))
}
