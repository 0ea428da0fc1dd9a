//! Storage path configuration.
//!
//! All durable state lives under a single data directory:
//! `{data_dir}/tasks.json` for the live task set and `{data_dir}/memory/`
//! for archive snapshots written by clear operations. The directory can be
//! overridden with the `TASKBOARD_DATA_DIR` environment variable and defaults
//! to `data/` under the current working directory.

use std::path::{Path, PathBuf};

/// File name of the live task set inside the data directory.
const TASKS_FILE: &str = "tasks.json";

/// Subdirectory holding archive snapshots of completed tasks.
const MEMORY_DIR: &str = "memory";

/// Explicit storage configuration, constructed once at startup and passed
/// into the store. There are no ambient path globals.
#[derive(Debug, Clone)]
pub struct Config {
    data_dir: PathBuf,
}

impl Config {
    /// Build a configuration rooted at the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Build a configuration from the environment.
    ///
    /// Uses `TASKBOARD_DATA_DIR` when set, otherwise `data/` under the
    /// current working directory.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("TASKBOARD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join("data")
            });
        Self { data_dir }
    }

    /// Root data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the live task file.
    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }

    /// Path of the archive ("memory") directory.
    pub fn memory_dir(&self) -> PathBuf {
        self.data_dir.join(MEMORY_DIR)
    }
}
