//! Persistent task store.
//!
//! Authoritative durable state for the live task set, backed by a single
//! JSON document (`{"tasks": [...]}`). Every mutation reads the whole file,
//! modifies it in memory, and rewrites it as a full snapshot; correctness
//! relies on a single active writer (the enclosing tool dispatcher serializes
//! calls). IO errors surface to the caller unchanged — there is no retry and
//! no partial-write recovery.

mod reconcile;
mod search;

pub use reconcile::{TaskSpec, UpdateMode};
pub use search::{Pagination, SearchPage};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::deps::{self, ExecutionCheck};
use crate::task::{RelatedFile, Task, TaskDependency, TaskStatus};

/// Wire form of the live task file and of archive snapshots.
#[derive(Debug, Serialize, Deserialize)]
struct TaskFile {
    tasks: Vec<Task>,
}

/// Typed failures of store operations. Never panics; callers surface these
/// as human-readable tool output.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(Uuid),
    #[error("task {0} is completed; only the summary and related files may be updated")]
    CompletedImmutable(Uuid),
    #[error("task {0} is completed and cannot be deleted")]
    DeleteCompleted(Uuid),
    #[error("task {id} cannot be deleted because the following tasks depend on it: {dependents}")]
    HasDependents { id: Uuid, dependents: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("corrupt task data: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Partial update applied by [`TaskStore::update`]. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: Option<TaskStatus>,
    pub summary: Option<String>,
    pub dependencies: Option<Vec<TaskDependency>>,
    pub related_files: Option<Vec<RelatedFile>>,
    pub implementation_guide: Option<String>,
    pub verification_criteria: Option<String>,
    pub analysis_result: Option<String>,
}

impl TaskPatch {
    /// Whether the patch stays within the fields a completed task still
    /// accepts (summary and related files).
    fn allowed_on_completed(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.notes.is_none()
            && self.status.is_none()
            && self.dependencies.is_none()
            && self.implementation_guide.is_none()
            && self.verification_criteria.is_none()
            && self.analysis_result.is_none()
    }
}

/// Content update accepted by [`TaskStore::update_content`]. Dependency
/// references are raw tokens (IDs or names) and are resolved before
/// persistence.
#[derive(Debug, Clone, Default)]
pub struct ContentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub dependencies: Option<Vec<String>>,
    pub related_files: Option<Vec<RelatedFile>>,
    pub implementation_guide: Option<String>,
    pub verification_criteria: Option<String>,
}

impl ContentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.notes.is_none()
            && self.dependencies.is_none()
            && self.related_files.is_none()
            && self.implementation_guide.is_none()
            && self.verification_criteria.is_none()
    }
}

/// Outcome of [`TaskStore::clear_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearOutcome {
    /// Total tasks removed from the live set.
    pub cleared: usize,
    /// Completed tasks written to the archive snapshot.
    pub archived: usize,
    /// Archive file name, absent when the live set was already empty.
    pub backup_file: Option<String>,
}

/// File-backed task store. Cheap to clone per call; all IO goes through
/// `tokio::fs`.
#[derive(Debug, Clone)]
pub struct TaskStore {
    config: Config,
}

impl TaskStore {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// One-time bootstrap: create the data directory and an empty task file
    /// if they do not exist yet.
    async fn ensure_data_dir(&self) -> Result<(), StoreError> {
        let data_dir = self.config.data_dir();
        if !data_dir.exists() {
            tokio::fs::create_dir_all(data_dir).await?;
            tracing::info!("Created data directory at {}", data_dir.display());
        }
        let tasks_file = self.config.tasks_file();
        if !tasks_file.exists() {
            let empty = serde_json::to_string(&TaskFile { tasks: Vec::new() })?;
            tokio::fs::write(&tasks_file, empty).await?;
            tracing::info!("Bootstrapped empty task file at {}", tasks_file.display());
        }
        Ok(())
    }

    /// Load the full ordered task set, bootstrapping storage on first use.
    /// Malformed persisted records fail the load; nothing is coerced.
    pub async fn load(&self) -> Result<Vec<Task>, StoreError> {
        self.ensure_data_dir().await?;
        let contents = tokio::fs::read_to_string(self.config.tasks_file()).await?;
        let file: TaskFile = serde_json::from_str(&contents)?;
        Ok(file.tasks)
    }

    /// Replace the entire persisted set with the given sequence
    /// (full-snapshot semantics).
    pub async fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.ensure_data_dir().await?;
        let contents = serde_json::to_string_pretty(&TaskFile {
            tasks: tasks.to_vec(),
        })?;
        tokio::fs::write(self.config.tasks_file(), contents).await?;
        tracing::debug!("Saved {} tasks to {}", tasks.len(), self.config.tasks_file().display());
        Ok(())
    }

    /// Look a task up by ID in the live set.
    pub async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let tasks = self.load().await?;
        Ok(tasks.into_iter().find(|t| t.id == id))
    }

    /// Append a new pending task. Dependency IDs are stored verbatim; this
    /// call does not validate that they exist.
    pub async fn create(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        notes: Option<String>,
        dependencies: Vec<Uuid>,
        related_files: Option<Vec<RelatedFile>>,
    ) -> Result<Task, StoreError> {
        let mut tasks = self.load().await?;
        let mut task = Task::new(name, description);
        task.notes = notes;
        task.dependencies = dependencies
            .into_iter()
            .map(|task_id| TaskDependency { task_id })
            .collect();
        task.related_files = related_files;
        tasks.push(task.clone());
        self.save(&tasks).await?;
        Ok(task)
    }

    /// Apply a partial update. Fails closed when the ID is unknown or when
    /// the task is completed and the patch touches anything beyond the
    /// summary and related files. On success refreshes `updatedAt`, and
    /// stamps `completedAt` on the transition to completed.
    pub async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<Task, StoreError> {
        let mut tasks = self.load().await?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if task.is_completed() && !patch.allowed_on_completed() {
            return Err(StoreError::CompletedImmutable(id));
        }

        let was_completed = task.is_completed();
        if let Some(name) = patch.name {
            task.name = name;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(notes) = patch.notes {
            task.notes = Some(notes);
        }
        if let Some(summary) = patch.summary {
            task.summary = Some(summary);
        }
        if let Some(dependencies) = patch.dependencies {
            task.dependencies = dependencies;
        }
        if let Some(related_files) = patch.related_files {
            task.related_files = Some(related_files);
        }
        if let Some(implementation_guide) = patch.implementation_guide {
            task.implementation_guide = Some(implementation_guide);
        }
        if let Some(verification_criteria) = patch.verification_criteria {
            task.verification_criteria = Some(verification_criteria);
        }
        if let Some(analysis_result) = patch.analysis_result {
            task.analysis_result = Some(analysis_result);
        }
        if let Some(status) = patch.status {
            task.status = status;
            if status == TaskStatus::Completed && !was_completed {
                task.completed_at = Some(Utc::now());
            }
        }
        task.updated_at = Utc::now();

        let updated = task.clone();
        self.save(&tasks).await?;
        Ok(updated)
    }

    /// Change a task's status, stamping `completedAt` when it completes.
    pub async fn update_status(&self, id: Uuid, status: TaskStatus) -> Result<Task, StoreError> {
        self.update(
            id,
            TaskPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Set the completion summary. Allowed on completed tasks.
    pub async fn update_summary(&self, id: Uuid, summary: String) -> Result<Task, StoreError> {
        self.update(
            id,
            TaskPatch {
                summary: Some(summary),
                ..Default::default()
            },
        )
        .await
    }

    /// Update a task's descriptive content. Refused outright on completed
    /// tasks; raw dependency tokens are resolved against the current task
    /// set before persistence.
    pub async fn update_content(&self, id: Uuid, update: ContentUpdate) -> Result<Task, StoreError> {
        let tasks = self.load().await?;
        let task = tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if task.is_completed() {
            return Err(StoreError::CompletedImmutable(id));
        }

        let dependencies = update.dependencies.map(|tokens| {
            let name_to_id = tasks.iter().map(|t| (t.name.clone(), t.id)).collect();
            let known_ids = tasks.iter().map(|t| t.id).collect();
            deps::resolve_dependencies(&tokens, &name_to_id, &known_ids, Some(id))
        });

        self.update(
            id,
            TaskPatch {
                name: update.name,
                description: update.description,
                notes: update.notes,
                dependencies,
                related_files: update.related_files,
                implementation_guide: update.implementation_guide,
                verification_criteria: update.verification_criteria,
                ..Default::default()
            },
        )
        .await
    }

    /// Delete a task. Refused when the task is completed or when any other
    /// live task depends on it; the error names the blocking dependents.
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tasks = self.load().await?;
        let index = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if tasks[index].is_completed() {
            return Err(StoreError::DeleteCompleted(id));
        }

        let dependents: Vec<String> = tasks
            .iter()
            .filter(|t| t.id != id && t.dependencies.iter().any(|dep| dep.task_id == id))
            .map(|t| format!("\"{}\" (ID: {})", t.name, t.id))
            .collect();
        if !dependents.is_empty() {
            return Err(StoreError::HasDependents {
                id,
                dependents: dependents.join(", "),
            });
        }

        tasks.remove(index);
        self.save(&tasks).await?;
        Ok(())
    }

    /// Archive completed tasks into a timestamped snapshot under the memory
    /// directory, then truncate the live set. When the live set is already
    /// empty this is a no-op success and writes no archive file.
    pub async fn clear_all(&self) -> Result<ClearOutcome, StoreError> {
        let tasks = self.load().await?;
        if tasks.is_empty() {
            return Ok(ClearOutcome {
                cleared: 0,
                archived: 0,
                backup_file: None,
            });
        }

        let completed: Vec<Task> = tasks.iter().filter(|t| t.is_completed()).cloned().collect();

        let memory_dir = self.config.memory_dir();
        if !memory_dir.exists() {
            tokio::fs::create_dir_all(&memory_dir).await?;
        }

        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
        let backup_file = format!("tasks_memory_{timestamp}.json");
        let snapshot = serde_json::to_string_pretty(&TaskFile {
            tasks: completed.clone(),
        })?;
        tokio::fs::write(memory_dir.join(&backup_file), snapshot).await?;

        self.save(&[]).await?;
        tracing::info!(
            "Cleared {} tasks; archived {} completed tasks to {}",
            tasks.len(),
            completed.len(),
            backup_file
        );

        Ok(ClearOutcome {
            cleared: tasks.len(),
            archived: completed.len(),
            backup_file: Some(backup_file),
        })
    }

    /// Check whether a task is schedulable (every dependency completed).
    pub async fn can_execute(&self, id: Uuid) -> Result<ExecutionCheck, StoreError> {
        let tasks = self.load().await?;
        let task = tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        Ok(deps::execution_check(task, &tasks))
    }
}
