//! Task planning tool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Tool;
use crate::store::TaskStore;
use crate::task::TaskStatus;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanTaskArgs {
    description: String,
    #[serde(default)]
    requirements: Option<String>,
    #[serde(default)]
    existing_tasks_reference: bool,
}

/// Produce planning guidance for a described goal, optionally referencing
/// the tasks already in the store.
pub struct PlanTask;

#[async_trait]
impl Tool for PlanTask {
    fn name(&self) -> &str {
        "plan_task"
    }

    fn description(&self) -> &str {
        "Start planning a piece of work. Provide a complete description of the goal, background, and expected outcome; optionally reference existing tasks for continuity planning."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "minLength": 10,
                    "description": "Complete task problem description: objectives, background, and expected outcomes"
                },
                "requirements": {
                    "type": "string",
                    "description": "Specific technical requirements, business constraints, or quality standards (optional)"
                },
                "existingTasksReference": {
                    "type": "boolean",
                    "description": "Whether to reference existing tasks as a basis for planning",
                    "default": false
                }
            },
            "required": ["description"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: PlanTaskArgs = serde_json::from_value(args)?;
        if args.description.chars().count() < 10 {
            anyhow::bail!(
                "Task description cannot be shorter than 10 characters; provide a more detailed description"
            );
        }

        let mut out = String::from("## Task Planning\n\n");
        out.push_str(&format!("**Goal:** {}\n", args.description));
        if let Some(requirements) = &args.requirements {
            out.push_str(&format!("\n**Requirements:** {}\n", requirements));
        }

        if args.existing_tasks_reference {
            let all_tasks = store.load().await?;
            let (completed, pending): (Vec<_>, Vec<_>) = all_tasks
                .iter()
                .partition(|t| t.status == TaskStatus::Completed);

            out.push_str(&format!(
                "\n### Existing Task Reference\n\nCompleted: {} task(s), unfinished: {} task(s).\n",
                completed.len(),
                pending.len()
            ));
            if !completed.is_empty() {
                out.push_str("\n**Completed:**\n");
                for task in &completed {
                    out.push_str(&format!("- {} (ID: `{}`)\n", task.name, task.id));
                }
            }
            if !pending.is_empty() {
                out.push_str("\n**Unfinished:**\n");
                for task in &pending {
                    out.push_str(&format!(
                        "- {} (ID: `{}`, status: {})\n",
                        task.name, task.id, task.status
                    ));
                }
            }
            out.push_str(&format!(
                "\nPast completed tasks are archived under `{}`.\n",
                store.config().memory_dir().display()
            ));
        }

        out.push_str(
            "\nAnalyze the goal, break it into atomic tasks with clear completion criteria, then submit them with `split_tasks`.",
        );
        Ok(out)
    }
}
