//! Task splitting / batch reconciliation tool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Tool;
use crate::store::{TaskSpec, TaskStore, UpdateMode};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplitTasksArgs {
    update_mode: UpdateMode,
    tasks: Vec<TaskSpec>,
    #[serde(default)]
    global_analysis_result: Option<String>,
}

/// Merge a structured task list into the store under one of the four update
/// modes. Hard validation (duplicate names, malformed specs) happens here,
/// before any mutation.
pub struct SplitTasks;

fn validate(args: &SplitTasksArgs) -> anyhow::Result<()> {
    if args.tasks.is_empty() {
        anyhow::bail!("Please provide at least one task");
    }

    let mut seen = std::collections::HashSet::new();
    for spec in &args.tasks {
        if spec.name.chars().count() > 100 {
            anyhow::bail!(
                "Task name \"{}\" is too long; limit it to 100 characters",
                spec.name
            );
        }
        if spec.description.chars().count() < 10 {
            anyhow::bail!(
                "Description of task \"{}\" is too short; provide more detail to ensure understanding",
                spec.name
            );
        }
        if let Some(files) = &spec.related_files {
            for file in files {
                if file.path.is_empty() {
                    anyhow::bail!("File path cannot be empty (task \"{}\")", spec.name);
                }
            }
        }
        if !seen.insert(spec.name.as_str()) {
            anyhow::bail!(
                "tasks parameter contains duplicate task names; ensure each task name is unique"
            );
        }
    }
    Ok(())
}

#[async_trait]
impl Tool for SplitTasks {
    fn name(&self) -> &str {
        "split_tasks"
    }

    fn description(&self) -> &str {
        "Submit a structured list of atomic tasks. updateMode controls how the list merges with existing tasks: append, overwrite (replace unfinished tasks), selective (update matching names in place), or clearAllTasks (archive everything first)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "updateMode": {
                    "type": "string",
                    "enum": ["append", "overwrite", "selective", "clearAllTasks"],
                    "description": "Task update mode: append (keep existing tasks), overwrite (clear unfinished tasks, keep completed ones), selective (update by name match, keep the rest), clearAllTasks (archive and clear, then add)"
                },
                "tasks": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "maxLength": 100 },
                            "description": { "type": "string", "minLength": 10 },
                            "implementationGuide": { "type": "string" },
                            "dependencies": {
                                "type": "array",
                                "items": { "type": "string" },
                                "description": "Prerequisite tasks, referenced by ID or by name"
                            },
                            "notes": { "type": "string" },
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
                            "verificationCriteria": { "type": "string" }
                        },
                        "required": ["name", "description"]
                    }
                },
                "globalAnalysisResult": {
                    "type": "string",
                    "description": "Analysis shared by every task in the batch (optional)"
                }
            },
            "required": ["updateMode", "tasks"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: SplitTasksArgs = serde_json::from_value(args)?;
        validate(&args)?;

        let mut out = String::from("## Task Split Result\n\n");

        // Run the clear step directly when asked, so the archive file can be
        // reported; the batch then appends against the empty set.
        let effective_mode = if args.update_mode == UpdateMode::ClearAllTasks {
            let outcome = store.clear_all().await?;
            match outcome.backup_file {
                Some(backup) => out.push_str(&format!(
                    "Cleared {} task(s); {} completed task(s) archived to `{}`.\n",
                    outcome.cleared, outcome.archived, backup
                )),
                None => out.push_str("No tasks needed clearing.\n"),
            }
            UpdateMode::Append
        } else {
            args.update_mode
        };

        let created = store
            .batch_create_or_update(&args.tasks, effective_mode, args.global_analysis_result)
            .await?;

        match args.update_mode {
            UpdateMode::Append | UpdateMode::ClearAllTasks => {
                out.push_str(&format!("Successfully added {} new task(s).\n", created.len()));
            }
            UpdateMode::Overwrite => out.push_str(&format!(
                "Cleared unfinished tasks and created {} new task(s).\n",
                created.len()
            )),
            UpdateMode::Selective => out.push_str(&format!(
                "Selectively updated/created {} task(s).\n",
                created.len()
            )),
        }

        out.push_str("\n**Created/updated tasks:**\n");
        for task in &created {
            out.push_str(&format!("- {} (ID: `{}`)\n", task.name, task.id));
            if !task.dependencies.is_empty() {
                let deps: Vec<String> = task
                    .dependencies
                    .iter()
                    .map(|d| format!("`{}`", d.task_id))
                    .collect();
                out.push_str(&format!("  - depends on: {}\n", deps.join(", ")));
            }
        }

        let all_tasks = store.load().await?;
        out.push_str(&format!(
            "\nThe store now holds {} task(s). Use `execute_task` to start the first schedulable one.",
            all_tasks.len()
        ));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::temp_store;

    fn spec_json(name: &str) -> Value {
        json!({ "name": name, "description": "a sufficiently long description" })
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected_before_mutation() {
        let (_dir, store) = temp_store();
        let err = SplitTasks
            .execute(
                json!({
                    "updateMode": "append",
                    "tasks": [spec_json("same"), spec_json("same")]
                }),
                &store,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_creates_tasks_and_reports_them() {
        let (_dir, store) = temp_store();
        let text = SplitTasks
            .execute(
                json!({
                    "updateMode": "append",
                    "tasks": [
                        spec_json("first"),
                        {
                            "name": "second",
                            "description": "a sufficiently long description",
                            "dependencies": ["first"]
                        }
                    ]
                }),
                &store,
            )
            .await
            .unwrap();
        assert!(text.contains("added 2 new task(s)"));
        let all = store.load().await.unwrap();
        assert_eq!(all.len(), 2);
        let second = all.iter().find(|t| t.name == "second").unwrap();
        assert_eq!(second.dependencies.len(), 1);
    }

    #[tokio::test]
    async fn clear_all_tasks_mode_reports_backup() {
        let (_dir, store) = temp_store();
        let done = store.create("old", "finished work", None, vec![], None).await.unwrap();
        store
            .update_status(done.id, crate::task::TaskStatus::Completed)
            .await
            .unwrap();

        let text = SplitTasks
            .execute(
                json!({ "updateMode": "clearAllTasks", "tasks": [spec_json("fresh")] }),
                &store,
            )
            .await
            .unwrap();
        assert!(text.contains("archived to `tasks_memory_"));
        let all = store.load().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "fresh");
    }

    #[tokio::test]
    async fn short_description_is_rejected() {
        let (_dir, store) = temp_store();
        let err = SplitTasks
            .execute(
                json!({
                    "updateMode": "append",
                    "tasks": [{ "name": "x", "description": "short" }]
                }),
                &store,
            )
            .await;
        assert!(err.is_err());
    }
}
