//! Query and listing tools.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Tool;
use crate::store::TaskStore;
use crate::task::{Task, TaskStatus};

const MAX_PAGE_SIZE: usize = 20;

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    5
}

fn one_line(task: &Task) -> String {
    format!(
        "- **{}** (ID: `{}`, status: {}) — {}",
        task.name,
        task.id,
        task.status,
        task.description.chars().take(100).collect::<String>()
    )
}

fn detail(task: &Task) -> String {
    let mut out = format!("## {}\n\n", task.name);
    out.push_str(&format!("- **ID:** `{}`\n", task.id));
    out.push_str(&format!("- **Status:** {}\n", task.status));
    out.push_str(&format!("- **Created:** {}\n", task.created_at.to_rfc3339()));
    out.push_str(&format!("- **Updated:** {}\n", task.updated_at.to_rfc3339()));
    if let Some(completed_at) = task.completed_at {
        out.push_str(&format!("- **Completed:** {}\n", completed_at.to_rfc3339()));
    }
    out.push_str(&format!("\n### Description\n\n{}\n", task.description));
    if let Some(notes) = &task.notes {
        out.push_str(&format!("\n### Notes\n\n{notes}\n"));
    }
    if let Some(guide) = &task.implementation_guide {
        out.push_str(&format!("\n### Implementation Guide\n\n{guide}\n"));
    }
    if let Some(criteria) = &task.verification_criteria {
        out.push_str(&format!("\n### Verification Criteria\n\n{criteria}\n"));
    }
    if !task.dependencies.is_empty() {
        out.push_str("\n### Dependencies\n\n");
        for dep in &task.dependencies {
            out.push_str(&format!("- `{}`\n", dep.task_id));
        }
    }
    if let Some(files) = &task.related_files {
        if !files.is_empty() {
            out.push_str("\n### Related Files\n\n");
            for file in files {
                out.push_str(&format!("- {:?}: `{}`\n", file.file_type, file.path));
            }
        }
    }
    if let Some(summary) = &task.summary {
        out.push_str(&format!("\n### Summary\n\n{summary}\n"));
    }
    out
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryTaskArgs {
    query: String,
    #[serde(default)]
    is_id: bool,
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

/// Search tasks by ID or keywords across the live set and the archive.
pub struct QueryTask;

#[async_trait]
impl Tool for QueryTask {
    fn name(&self) -> &str {
        "query_task"
    }

    fn description(&self) -> &str {
        "Search tasks by ID or by space-separated keywords. Matches the live task list and archived memory; results are paginated."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Task ID or keywords (space separated)"
                },
                "isId": {
                    "type": "boolean",
                    "description": "Whether the query is an exact task ID",
                    "default": false
                },
                "page": { "type": "integer", "minimum": 1, "default": 1 },
                "pageSize": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_PAGE_SIZE,
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: QueryTaskArgs = serde_json::from_value(args)?;
        if args.query.is_empty() {
            anyhow::bail!("Query content cannot be empty; provide a task ID or search keywords");
        }
        if args.page_size == 0 || args.page_size > MAX_PAGE_SIZE {
            anyhow::bail!("pageSize must be between 1 and {MAX_PAGE_SIZE}");
        }

        let page = store
            .search(&args.query, args.is_id, args.page, args.page_size)
            .await?;

        let mut out = format!("## Query Results for \"{}\"\n\n", args.query);
        if page.tasks.is_empty() {
            out.push_str("No matching tasks found.\n");
        } else {
            for task in &page.tasks {
                out.push_str(&one_line(task));
                out.push('\n');
            }
        }
        out.push_str(&format!(
            "\nPage {} of {} ({} result(s) total{}).",
            page.pagination.current_page,
            page.pagination.total_pages,
            page.pagination.total_results,
            if page.pagination.has_more {
                ", more available"
            } else {
                ""
            }
        ));
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTaskDetailArgs {
    task_id: String,
}

/// Full detail view of one task, found by ID in the live set or archive.
pub struct GetTaskDetail;

#[async_trait]
impl Tool for GetTaskDetail {
    fn name(&self) -> &str {
        "get_task_detail"
    }

    fn description(&self) -> &str {
        "Show the complete detail of a task by ID, including archived tasks."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": {
                    "type": "string",
                    "minLength": 1,
                    "description": "ID of the task to view"
                }
            },
            "required": ["taskId"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: GetTaskDetailArgs = serde_json::from_value(args)?;
        if args.task_id.is_empty() {
            anyhow::bail!("Task ID cannot be empty");
        }

        let page = store.search(&args.task_id, true, 1, 1).await?;
        let Some(task) = page.tasks.first() else {
            anyhow::bail!(
                "Task `{}` not found. Please confirm the task ID is correct.",
                args.task_id
            );
        };
        Ok(detail(task))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StatusFilter {
    All,
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Deserialize)]
struct ListTasksArgs {
    status: StatusFilter,
}

/// Grouped overview of the live task set.
pub struct ListTasks;

#[async_trait]
impl Tool for ListTasks {
    fn name(&self) -> &str {
        "list_tasks"
    }

    fn description(&self) -> &str {
        "List live tasks grouped by status, optionally filtered to one status."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["all", "pending", "in_progress", "completed"],
                    "description": "Status to list, or all"
                }
            },
            "required": ["status"]
        })
    }

    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String> {
        let args: ListTasksArgs = serde_json::from_value(args)?;
        let all_tasks = store.load().await?;

        let wanted = |status: TaskStatus| match args.status {
            StatusFilter::All => true,
            StatusFilter::Pending => status == TaskStatus::Pending,
            StatusFilter::InProgress => status == TaskStatus::InProgress,
            StatusFilter::Completed => status == TaskStatus::Completed,
        };

        let mut out = String::from("## Task List\n");
        let mut listed = 0;
        for group in [
            TaskStatus::InProgress,
            TaskStatus::Pending,
            TaskStatus::Blocked,
            TaskStatus::Completed,
        ] {
            if !wanted(group) {
                continue;
            }
            let tasks: Vec<&Task> = all_tasks.iter().filter(|t| t.status == group).collect();
            if tasks.is_empty() {
                continue;
            }
            listed += tasks.len();
            out.push_str(&format!("\n### {} ({})\n\n", group, tasks.len()));
            for task in tasks {
                out.push_str(&one_line(task));
                out.push('\n');
            }
        }
        if listed == 0 {
            out.push_str("\nNo tasks match the requested status.\n");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::temp_store;

    #[tokio::test]
    async fn query_renders_pagination_summary() {
        let (_dir, store) = temp_store();
        for i in 0..7 {
            store
                .create(format!("task {i}"), "matching description", None, vec![], None)
                .await
                .unwrap();
        }
        let text = QueryTask
            .execute(json!({"query": "matching", "pageSize": 5}), &store)
            .await
            .unwrap();
        assert!(text.contains("Page 1 of 2"));
        assert!(text.contains("7 result(s) total"));
        assert!(text.contains("more available"));
    }

    #[tokio::test]
    async fn query_rejects_oversized_page() {
        let (_dir, store) = temp_store();
        let err = QueryTask
            .execute(json!({"query": "x", "pageSize": 21}), &store)
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn detail_finds_archived_tasks() {
        let (_dir, store) = temp_store();
        let task = store.create("archived", "old work", None, vec![], None).await.unwrap();
        store
            .update_status(task.id, TaskStatus::Completed)
            .await
            .unwrap();
        store.clear_all().await.unwrap();

        let text = GetTaskDetail
            .execute(json!({"taskId": task.id.to_string()}), &store)
            .await
            .unwrap();
        assert!(text.contains("archived"));
        assert!(text.contains(&task.id.to_string()));
    }

    #[tokio::test]
    async fn detail_errors_on_unknown_id() {
        let (_dir, store) = temp_store();
        let err = GetTaskDetail
            .execute(json!({"taskId": uuid::Uuid::new_v4().to_string()}), &store)
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (_dir, store) = temp_store();
        let done = store.create("done", "finished work", None, vec![], None).await.unwrap();
        store
            .update_status(done.id, TaskStatus::Completed)
            .await
            .unwrap();
        store.create("open", "pending work", None, vec![], None).await.unwrap();

        let text = ListTasks
            .execute(json!({"status": "pending"}), &store)
            .await
            .unwrap();
        assert!(text.contains("open"));
        assert!(!text.contains("done"));

        let text = ListTasks.execute(json!({"status": "all"}), &store).await.unwrap();
        assert!(text.contains("open"));
        assert!(text.contains("done"));
    }
}
