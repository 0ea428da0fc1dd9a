//! Task maintenance tools: content update, deletion, and clearing.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Tool;
use crate::store::{ContentUpdate, TaskStore};
use crate::task::RelatedFile;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTaskArgs {
    task_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    dependencies: Option<Vec<String>>,
    #[serde(default)]
    related_files: Option<Vec<RelatedFile>>,
    #[serde(default)]
    implementation_guide: Option<String>,
    #[serde(default)]
    verification_criteria: Option<String>,
}

/// Update an unfinished task's content. Completed tasks are refused.
pub struct UpdateTask;

#[async_trait]
impl Tool for UpdateTask {
    fn name(&self) -> &str {
        "update_task"
    }

    fn description(&self) -> &str {
        "Update the content of an existing, unfinished task: name, description, notes, dependencies, related files, implementation guide, or verification criteria."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": { "type": "string", "format": "uuid" },
                "name": { "type": "string" },
                "description": { "type": "string" },
                "notes": { "type": "string" },
                "dependencies": { "type": "array", "items": { "type": "string" } },
                "relatedFiles": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": { "type": "string", "minLength": 1 },
                            "type": {
                                "type": "string",
                                "enum": ["TO_MODIFY", "REFERENCE", "CREATE", "DEPENDENCY", "OTHER"]
                            },
                            "description": { "type": "string" },
                            "lineStart": { "type": "integer", "minimum": 1 },
                            "lineEnd": { "type": "integer", "minimum": 1 }
                        },
                        "required": ["path", "type"]
                    }
                },
                "implementationGuide": { "type": "string" },
                "verificationCriteria": { "type": "string" }
            },
            "required": ["taskId"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: UpdateTaskArgs = serde_json::from_value(args)?;
        let task_id = crate::deps::parse_canonical_id(&args.task_id)
            .ok_or_else(|| anyhow::anyhow!("Task ID format is invalid; provide a valid UUID"))?;

        if let Some(files) = &args.related_files {
            for file in files {
                let valid = match (file.line_start, file.line_end) {
                    (Some(start), Some(end)) => start <= end,
                    (None, None) => true,
                    _ => false,
                };
                if !valid {
                    anyhow::bail!(
                        "Invalid line range for `{}`: both start and end must be set, with start no greater than end",
                        file.path
                    );
                }
            }
        }

        let update = ContentUpdate {
            name: args.name,
            description: args.description,
            notes: args.notes,
            dependencies: args.dependencies,
            related_files: args.related_files,
            implementation_guide: args.implementation_guide,
            verification_criteria: args.verification_criteria,
        };
        if update.is_empty() {
            return Ok(format!(
                "No content to update for task `{task_id}`; supply at least one field."
            ));
        }

        let updated = store.update_content(task_id, update).await?;
        Ok(format!(
            "Task \"{}\" (ID: `{}`) updated successfully.",
            updated.name, updated.id
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteTaskArgs {
    task_id: String,
}

/// Delete an unfinished task that nothing depends on.
pub struct DeleteTask;

#[async_trait]
impl Tool for DeleteTask {
    fn name(&self) -> &str {
        "delete_task"
    }

    fn description(&self) -> &str {
        "Delete an unfinished task by ID. Completed tasks and tasks that other tasks depend on cannot be deleted."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": { "type": "string", "format": "uuid" }
            },
            "required": ["taskId"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: DeleteTaskArgs = serde_json::from_value(args)?;
        let task_id = crate::deps::parse_canonical_id(&args.task_id)
            .ok_or_else(|| anyhow::anyhow!("Task ID format is invalid; provide a valid UUID"))?;
        store.delete(task_id).await?;
        Ok(format!("Task `{task_id}` deleted successfully."))
    }
}

#[derive(Debug, Deserialize)]
struct ClearAllTasksArgs {
    confirm: bool,
}

/// Archive completed tasks and empty the live store. Requires explicit
/// confirmation.
pub struct ClearAllTasks;

#[async_trait]
impl Tool for ClearAllTasks {
    fn name(&self) -> &str {
        "clear_all_tasks"
    }

    fn description(&self) -> &str {
        "Remove every task from the live store after archiving completed ones. Irreversible; confirm must be true."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "confirm": {
                    "type": "boolean",
                    "description": "Must be true to confirm this irreversible operation"
                }
            },
            "required": ["confirm"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: ClearAllTasksArgs = serde_json::from_value(args)?;
        if !args.confirm {
            anyhow::bail!(
                "The clear operation must be explicitly confirmed; set confirm to true"
            );
        }

        let outcome = store.clear_all().await?;
        match outcome.backup_file {
            Some(backup) => Ok(format!(
                "Successfully cleared all tasks: {} task(s) removed, {} completed task(s) archived to `{}`.",
                outcome.cleared, outcome.archived, backup
            )),
            None => Ok("No tasks to clear.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::temp_store;
    use crate::task::TaskStatus;

    #[tokio::test]
    async fn update_rejects_half_open_line_ranges() {
        let (_dir, store) = temp_store();
        let task = store.create("edit", "something to edit", None, vec![], None).await.unwrap();
        let err = UpdateTask
            .execute(
                json!({
                    "taskId": task.id.to_string(),
                    "relatedFiles": [
                        { "path": "src/lib.rs", "type": "TO_MODIFY", "lineStart": 5 }
                    ]
                }),
                &store,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("line range"));
    }

    #[tokio::test]
    async fn empty_update_is_a_friendly_no_op() {
        let (_dir, store) = temp_store();
        let task = store.create("edit", "something to edit", None, vec![], None).await.unwrap();
        let text = UpdateTask
            .execute(json!({"taskId": task.id.to_string()}), &store)
            .await
            .unwrap();
        assert!(text.contains("No content to update"));
    }

    #[tokio::test]
    async fn update_refuses_completed_tasks() {
        let (_dir, store) = temp_store();
        let task = store.create("done", "finished work", None, vec![], None).await.unwrap();
        store
            .update_status(task.id, TaskStatus::Completed)
            .await
            .unwrap();
        let err = UpdateTask
            .execute(
                json!({"taskId": task.id.to_string(), "description": "rewrite"}),
                &store,
            )
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn delete_reports_blocking_dependents() {
        let (_dir, store) = temp_store();
        let dep = store.create("dep", "prerequisite", None, vec![], None).await.unwrap();
        store
            .create("main", "depends on dep", None, vec![dep.id], None)
            .await
            .unwrap();
        let err = DeleteTask
            .execute(json!({"taskId": dep.id.to_string()}), &store)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("main"));
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let (_dir, store) = temp_store();
        let err = ClearAllTasks
            .execute(json!({"confirm": false}), &store)
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn clear_on_empty_store_reports_nothing_to_do() {
        let (_dir, store) = temp_store();
        let text = ClearAllTasks
            .execute(json!({"confirm": true}), &store)
            .await
            .unwrap();
        assert!(text.contains("No tasks to clear"));
    }
}
