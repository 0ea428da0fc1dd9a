//! Dependency resolution and executability checks.
//!
//! Callers reference prerequisite tasks either by ID or by name. At write
//! time every reference is resolved to a concrete task ID; tokens that
//! resolve to nothing (unknown name, ID of a task that will not exist after
//! the operation, or the task itself) are silently dropped rather than
//! failing the operation. Partial resolution is the documented policy.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::task::{Task, TaskDependency, TaskStatus};

/// Parse a token that has the canonical task-ID shape: 32 hex digits in
/// 8-4-4-4-12 grouping. Other UUID spellings (braced, simple, URN) are
/// treated as names.
pub fn parse_canonical_id(token: &str) -> Option<Uuid> {
    let bytes = token.as_bytes();
    if bytes.len() != 36 {
        return None;
    }
    for (i, b) in bytes.iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if *b != b'-' {
                    return None;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return None;
                }
            }
        }
    }
    Uuid::parse_str(token).ok()
}

/// Resolve raw dependency tokens into ID-based edges.
///
/// `name_to_id` maps the names of tasks that will exist after the operation;
/// `known_ids` is the corresponding ID set. `self_id`, when present, is the
/// task the edges belong to — a task never depends on itself.
pub fn resolve_dependencies(
    tokens: &[String],
    name_to_id: &HashMap<String, Uuid>,
    known_ids: &HashSet<Uuid>,
    self_id: Option<Uuid>,
) -> Vec<TaskDependency> {
    let mut resolved = Vec::new();
    for token in tokens {
        let task_id = match parse_canonical_id(token) {
            Some(id) => {
                if !known_ids.contains(&id) {
                    continue;
                }
                id
            }
            None => match name_to_id.get(token) {
                Some(id) => *id,
                None => continue,
            },
        };
        if self_id == Some(task_id) {
            continue;
        }
        resolved.push(TaskDependency { task_id });
    }
    resolved
}

/// Outcome of an executability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionCheck {
    pub can_execute: bool,
    /// Dependency IDs that are incomplete or missing. Empty when executable.
    pub blocked_by: Vec<Uuid>,
}

/// Whether a task is schedulable given the full task set.
///
/// Completed tasks are never executable (they are done). A task with no
/// dependencies is executable; otherwise every dependency must map to a
/// completed task.
pub fn execution_check(task: &Task, all_tasks: &[Task]) -> ExecutionCheck {
    if task.status == TaskStatus::Completed {
        return ExecutionCheck {
            can_execute: false,
            blocked_by: Vec::new(),
        };
    }
    if task.dependencies.is_empty() {
        return ExecutionCheck {
            can_execute: true,
            blocked_by: Vec::new(),
        };
    }

    let blocked_by: Vec<Uuid> = task
        .dependencies
        .iter()
        .filter(|dep| {
            !all_tasks
                .iter()
                .any(|t| t.id == dep.task_id && t.status == TaskStatus::Completed)
        })
        .map(|dep| dep.task_id)
        .collect();

    ExecutionCheck {
        can_execute: blocked_by.is_empty(),
        blocked_by,
    }
}
