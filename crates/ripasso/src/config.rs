//! Runtime configuration: where the database and generated files live.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::persistence::Persistence;
use crate::storage::SqliteStore;
use crate::tracker::Tracker;

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "RIPASSO_DATA_DIR";

/// Database file inside the data directory
pub const DB_FILE: &str = "ripasso.db";

/// Static page written by `build`
pub const HTML_FILE: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory from the command line, then
    /// `RIPASSO_DATA_DIR` (environment or `.env` file), then the current
    /// directory.
    pub fn resolve(data_dir: Option<PathBuf>) -> Self {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::resolve_from(data_dir, std::env::var(DATA_DIR_ENV).ok())
    }

    fn resolve_from(data_dir: Option<PathBuf>, env_value: Option<String>) -> Self {
        let data_dir = data_dir
            .or_else(|| {
                env_value
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from("."));

        Self { data_dir }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn html_path(&self) -> PathBuf {
        self.data_dir.join(HTML_FILE)
    }

    /// Open the database, creating the data directory if needed, and load
    /// the tracker from it
    pub fn open_tracker(&self) -> Result<Tracker> {
        ensure_dir(&self.data_dir)?;
        let store = SqliteStore::open(&self.db_path())?;
        Ok(Tracker::open(Persistence::new(store)))
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    }
    Ok(())
}
