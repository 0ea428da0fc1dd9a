//! Execution and verification tools.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::Tool;
use crate::store::TaskStore;
use crate::task::{self, TaskStatus};

/// Score at or above which verification completes the task.
const VERIFICATION_PASS_SCORE: f64 = 80.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteTaskArgs {
    task_id: String,
}

fn parse_task_id(raw: &str) -> anyhow::Result<Uuid> {
    crate::deps::parse_canonical_id(raw)
        .ok_or_else(|| anyhow::anyhow!("Task ID format is invalid; provide a valid UUID"))
}

/// Start executing a task: checks schedulability, moves the task to
/// in-progress, and returns execution guidance.
pub struct ExecuteTask;

#[async_trait]
impl Tool for ExecuteTask {
    fn name(&self) -> &str {
        "execute_task"
    }

    fn description(&self) -> &str {
        "Begin executing a task by ID. Fails with a blocking-dependency report when prerequisites are unfinished; otherwise marks the task in progress and returns guidance."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": {
                    "type": "string",
                    "format": "uuid",
                    "description": "ID of an existing, incomplete task to execute"
                }
            },
            "required": ["taskId"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: ExecuteTaskArgs = serde_json::from_value(args)?;
        let task_id = parse_task_id(&args.task_id)?;

        let Some(task) = store.get(task_id).await? else {
            return Ok(format!(
                "Task with ID `{task_id}` not found. Please confirm the ID is correct."
            ));
        };

        match task.status {
            TaskStatus::InProgress => {
                return Ok(format!(
                    "Task \"{}\" (ID: `{}`) is already in progress.",
                    task.name, task.id
                ));
            }
            TaskStatus::Completed => {
                return Ok(format!(
                    "Task \"{}\" (ID: `{}`) is already completed. To re-execute it, delete the task with `delete_task` and recreate it.",
                    task.name, task.id
                ));
            }
            TaskStatus::Pending | TaskStatus::Blocked => {}
        }

        let check = store.can_execute(task_id).await?;
        if !check.can_execute {
            let blocked = if check.blocked_by.is_empty() {
                "unable to determine the blocking reason".to_string()
            } else {
                let ids: Vec<String> =
                    check.blocked_by.iter().map(|id| format!("`{id}`")).collect();
                format!(
                    "blocked by the following incomplete dependency tasks: {}",
                    ids.join(", ")
                )
            };
            return Ok(format!(
                "Task \"{}\" (ID: `{}`) cannot be executed: {blocked}.",
                task.name, task.id
            ));
        }

        store.update_status(task_id, TaskStatus::InProgress).await?;
        let assessment = task::assess(&task);

        let mut out = format!("## Execute Task: {}\n\n", task.name);
        out.push_str(&format!("**ID:** `{}`\n\n{}\n", task.id, task.description));
        if let Some(notes) = &task.notes {
            out.push_str(&format!("\n**Notes:** {notes}\n"));
        }
        if let Some(guide) = &task.implementation_guide {
            out.push_str(&format!("\n### Implementation Guide\n\n{guide}\n"));
        }
        if let Some(criteria) = &task.verification_criteria {
            out.push_str(&format!("\n### Verification Criteria\n\n{criteria}\n"));
        }
        if let Some(analysis) = &task.analysis_result {
            out.push_str(&format!("\n### Analysis Background\n\n{analysis}\n"));
        }

        out.push_str(&format!(
            "\n### Complexity\n\nAssessed as **{}** (description: {} chars, dependencies: {}).\n",
            assessment.level,
            assessment.metrics.description_length,
            assessment.metrics.dependencies_count
        ));
        for recommendation in &assessment.recommendations {
            out.push_str(&format!("- {recommendation}\n"));
        }

        if !task.dependencies.is_empty() {
            out.push_str("\n### Completed Dependencies\n\n");
            let all_tasks = store.load().await?;
            for dep in &task.dependencies {
                if let Some(dep_task) = all_tasks.iter().find(|t| t.id == dep.task_id) {
                    let summary = dep_task.summary.as_deref().unwrap_or("(no summary)");
                    out.push_str(&format!("- **{}**: {}\n", dep_task.name, summary));
                }
            }
        }

        if let Some(files) = &task.related_files {
            if !files.is_empty() {
                out.push_str("\n### Related Files\n\n");
                for file in files {
                    let range = match (file.line_start, file.line_end) {
                        (Some(start), Some(end)) => format!(" (lines {start}-{end})"),
                        _ => String::new(),
                    };
                    out.push_str(&format!("- {:?}: `{}`{}\n", file.file_type, file.path, range));
                }
            }
        }

        out.push_str("\nWhen the work is done, call `verify_task` with a completion summary and score.");
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyTaskArgs {
    task_id: String,
    summary: String,
    score: f64,
}

/// Verify an in-progress task. A score at or above the pass threshold stores
/// the summary and completes the task; anything lower returns revision
/// guidance.
pub struct VerifyTask;

#[async_trait]
impl Tool for VerifyTask {
    fn name(&self) -> &str {
        "verify_task"
    }

    fn description(&self) -> &str {
        "Score a task against its verification criteria. A score of 80 or above completes the task with the given summary; below 80 the summary should describe what is missing."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": {
                    "type": "string",
                    "format": "uuid",
                    "description": "ID of the task to verify"
                },
                "summary": {
                    "type": "string",
                    "minLength": 30,
                    "description": "Completion summary when the score passes; otherwise a description of what is missing. At least 30 characters."
                },
                "score": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 100,
                    "description": "Verification score; 80 or above completes the task"
                }
            },
            "required": ["taskId", "summary", "score"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: VerifyTaskArgs = serde_json::from_value(args)?;
        let task_id = parse_task_id(&args.task_id)?;
        if args.summary.chars().count() < 30 {
            anyhow::bail!("Summary must be at least 30 characters");
        }
        if !(0.0..=100.0).contains(&args.score) {
            anyhow::bail!("Score must be between 0 and 100");
        }

        let Some(task) = store.get(task_id).await? else {
            anyhow::bail!(
                "Task ID `{task_id}` not found. Use `list_tasks` to confirm a valid task ID and try again."
            );
        };
        if task.status != TaskStatus::InProgress {
            anyhow::bail!(
                "Task \"{}\" (ID: `{}`) is currently in \"{}\" status, not in progress, and cannot be verified. Use `execute_task` to start it first.",
                task.name,
                task.id,
                task.status
            );
        }

        if args.score >= VERIFICATION_PASS_SCORE {
            store.update_summary(task_id, args.summary.clone()).await?;
            store.update_status(task_id, TaskStatus::Completed).await?;
            Ok(format!(
                "## Task Verified\n\nTask \"{}\" (ID: `{}`) scored {:.0} and is now completed.\n\n**Summary:** {}",
                task.name, task.id, args.score, args.summary
            ))
        } else {
            Ok(format!(
                "## Verification Below Threshold\n\nTask \"{}\" scored {:.0} (needs {:.0}). Address the following and verify again:\n\n{}",
                task.name, args.score, VERIFICATION_PASS_SCORE, args.summary
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::temp_store;

    const LONG_SUMMARY: &str = "Implemented, tested, and documented the feature end to end.";

    #[tokio::test]
    async fn execute_blocks_on_incomplete_dependencies() {
        let (_dir, store) = temp_store();
        let dep = store.create("dep", "prerequisite work", None, vec![], None).await.unwrap();
        let main = store
            .create("main", "dependent work", None, vec![dep.id], None)
            .await
            .unwrap();

        let text = ExecuteTask
            .execute(json!({"taskId": main.id.to_string()}), &store)
            .await
            .unwrap();
        assert!(text.contains("cannot be executed"));
        assert!(text.contains(&dep.id.to_string()));
        // Status must not have changed.
        let unchanged = store.get(main.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn execute_moves_pending_task_to_in_progress() {
        let (_dir, store) = temp_store();
        let task = store.create("solo", "independent work", None, vec![], None).await.unwrap();

        let text = ExecuteTask
            .execute(json!({"taskId": task.id.to_string()}), &store)
            .await
            .unwrap();
        assert!(text.contains("Execute Task: solo"));
        let updated = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);

        // A second call reports the in-progress state instead.
        let text = ExecuteTask
            .execute(json!({"taskId": task.id.to_string()}), &store)
            .await
            .unwrap();
        assert!(text.contains("already in progress"));
    }

    #[tokio::test]
    async fn verify_requires_in_progress_status() {
        let (_dir, store) = temp_store();
        let task = store.create("fresh", "not started yet", None, vec![], None).await.unwrap();

        let err = VerifyTask
            .execute(
                json!({"taskId": task.id.to_string(), "summary": LONG_SUMMARY, "score": 90}),
                &store,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot be verified"));
    }

    #[tokio::test]
    async fn passing_score_completes_with_summary() {
        let (_dir, store) = temp_store();
        let task = store.create("work", "verifiable work", None, vec![], None).await.unwrap();
        store
            .update_status(task.id, TaskStatus::InProgress)
            .await
            .unwrap();

        let text = VerifyTask
            .execute(
                json!({"taskId": task.id.to_string(), "summary": LONG_SUMMARY, "score": 85}),
                &store,
            )
            .await
            .unwrap();
        assert!(text.contains("now completed"));
        let done = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.summary.as_deref(), Some(LONG_SUMMARY));
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn failing_score_leaves_task_in_progress() {
        let (_dir, store) = temp_store();
        let task = store.create("work", "verifiable work", None, vec![], None).await.unwrap();
        store
            .update_status(task.id, TaskStatus::InProgress)
            .await
            .unwrap();

        let text = VerifyTask
            .execute(
                json!({"taskId": task.id.to_string(), "summary": LONG_SUMMARY, "score": 60}),
                &store,
            )
            .await
            .unwrap();
        assert!(text.contains("Below Threshold"));
        let unchanged = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, TaskStatus::InProgress);
        assert!(unchanged.summary.is_none());
    }

    #[tokio::test]
    async fn short_summary_is_rejected() {
        let (_dir, store) = temp_store();
        let err = VerifyTask
            .execute(
                json!({"taskId": Uuid::new_v4().to_string(), "summary": "too short", "score": 90}),
                &store,
            )
            .await;
        assert!(err.is_err());
    }
}
