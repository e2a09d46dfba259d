use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;
use regex::Regex;

static DEFAULT_DB_NAME: &str = "taskmaster.sqlite3";
static DEFAULT_COLLECTION: &str = "todos";
static ENV_DATA_DIR: &str = "TASKMASTER_DATA_DIR";
static ENV_COLLECTION: &str = "TASKMASTER_COLLECTION";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "taskmaster", "taskmaster"));

static COLLECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    db_path: PathBuf,
    collection: String,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory and collection
    /// using the provided overrides, environment variables, and defaults.
    pub fn discover(
        data_dir_override: Option<PathBuf>,
        collection_override: Option<String>,
    ) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let config = Self::from_data_dir(data_dir)?;
        Ok(config.with_collection(resolve_collection(collection_override)))
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join(DEFAULT_DB_NAME);
        Ok(Self {
            data_dir,
            db_path,
            collection: DEFAULT_COLLECTION.to_string(),
        })
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Describe why the store cannot be used, if it cannot.
    pub fn problem(&self) -> Option<String> {
        if self.collection.trim().is_empty() {
            return Some("collection name is missing".to_string());
        }
        if !COLLECTION_RE.is_match(&self.collection) {
            return Some(format!(
                "collection name '{}' must start with a letter and contain only letters, digits or '_'",
                self.collection
            ));
        }
        if !self.data_dir.is_dir() {
            return Some(format!(
                "data directory {} does not exist",
                self.data_dir.display()
            ));
        }
        None
    }
}

fn resolve_collection(collection_override: Option<String>) -> String {
    if let Some(collection) = collection_override {
        return collection;
    }

    env::var(ENV_COLLECTION).unwrap_or_else(|_| DEFAULT_COLLECTION.to_string())
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-taskmaster");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".taskmaster"));
    }

    Ok(env::current_dir()?.join(".taskmaster"))
}
