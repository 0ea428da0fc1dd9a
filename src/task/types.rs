//! Core task types.
//!
//! These structs define the persisted wire form of a task: field names are
//! camelCase and status values are snake_case strings, so a data directory
//! written by earlier deployments keeps decoding. Decoding is strict — a
//! record with a missing or malformed required field (including timestamps)
//! fails the load instead of being silently repaired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current stage of a task in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    Pending,
    /// Currently being executed.
    InProgress,
    /// Finished and verified. Terminal.
    Completed,
    /// Reserved: never set by the engine itself, only by a direct update.
    Blocked,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

/// A directed reference to a prerequisite task. Always a concrete ID —
/// name references supplied by callers are resolved before persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    #[serde(rename = "taskId")]
    pub task_id: Uuid,
}

/// How a file relates to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelatedFileType {
    ToModify,
    Reference,
    Create,
    Dependency,
    Other,
}

/// A file attached to a task, optionally narrowed to a line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedFile {
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: RelatedFileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
}

/// A unit of trackable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, immutable once assigned.
    pub id: Uuid,
    /// Short label. Uniqueness is only enforced within a single
    /// reconciliation batch, not globally.
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: TaskStatus,
    /// Prerequisite tasks; every one must be completed before this task is
    /// schedulable.
    #[serde(default)]
    pub dependencies: Vec<TaskDependency>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stamped exactly once, on the transition to completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Completion summary, produced by the verification step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_files: Option<Vec<RelatedFile>>,
    /// Technical analysis carried over from the planning stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_guide: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_criteria: Option<String>,
}

impl Task {
    /// Create a fresh pending task with a new v4 ID and current timestamps.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            notes: None,
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            summary: None,
            related_files: None,
            analysis_result: None,
            implementation_guide: None,
            verification_criteria: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
