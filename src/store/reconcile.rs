//! Batch reconciliation engine.
//!
//! Merges an incoming ordered list of task specifications into the live
//! store under exactly one caller-chosen mode and returns the created or
//! updated tasks (not the full merged set). Duplicate names within one
//! incoming batch are rejected at the tool boundary; the engine assumes
//! uniqueness within a single call.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::deps;
use crate::task::{RelatedFile, Task, TaskStatus};

/// How an incoming batch merges with the existing task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Keep every existing task; add all incoming specs as new tasks.
    #[serde(rename = "append")]
    Append,
    /// Discard every non-completed existing task; keep completed ones; add
    /// all incoming specs as new tasks.
    #[serde(rename = "overwrite")]
    Overwrite,
    /// Update existing non-completed tasks matched by exact name in place;
    /// keep everything else; create the rest as new tasks.
    #[serde(rename = "selective")]
    Selective,
    /// Archive completed tasks, empty the live set, then append.
    #[serde(rename = "clearAllTasks")]
    ClearAllTasks,
}

/// A caller-supplied task specification. Dependencies are raw tokens (task
/// IDs or names) resolved during reconciliation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub related_files: Option<Vec<RelatedFile>>,
    #[serde(default)]
    pub implementation_guide: Option<String>,
    #[serde(default)]
    pub verification_criteria: Option<String>,
}

impl TaskStore {
    /// Merge `specs` into the live set under `mode`, returning only the
    /// created/updated tasks in spec order.
    pub async fn batch_create_or_update(
        &self,
        specs: &[TaskSpec],
        mode: UpdateMode,
        global_analysis_result: Option<String>,
    ) -> Result<Vec<Task>, StoreError> {
        // clearAllTasks archives and empties first, then appends against the
        // now-empty live set.
        let mode = if mode == UpdateMode::ClearAllTasks {
            self.clear_all().await?;
            UpdateMode::Append
        } else {
            mode
        };

        let existing = self.load().await?;
        let incoming_names: HashSet<&str> = specs.iter().map(|s| s.name.as_str()).collect();

        // Carried-forward set per mode. In selective mode a non-completed
        // task whose name matches an incoming spec is updated in place (it
        // re-enters via the new-task list); a completed task with a matching
        // name stays untouched and the spec coexists with it.
        let tasks_to_keep: Vec<Task> = match mode {
            UpdateMode::Append => existing.clone(),
            UpdateMode::Overwrite => existing
                .iter()
                .filter(|t| t.is_completed())
                .cloned()
                .collect(),
            UpdateMode::Selective => existing
                .iter()
                .filter(|t| !incoming_names.contains(t.name.as_str()) || t.is_completed())
                .cloned()
                .collect(),
            UpdateMode::ClearAllTasks => Vec::new(),
        };

        // Name -> ID map used both to detect in-place updates and to resolve
        // dependency-by-name references. Selective mode seeds it from the
        // full pre-operation set so updates are detected before removal.
        let mut name_to_id: HashMap<String, Uuid> = HashMap::new();
        if mode == UpdateMode::Selective {
            for task in &existing {
                name_to_id.insert(task.name.clone(), task.id);
            }
        }
        for task in &tasks_to_keep {
            name_to_id.insert(task.name.clone(), task.id);
        }

        let now = Utc::now();
        let mut new_tasks: Vec<Task> = Vec::with_capacity(specs.len());

        for spec in specs {
            let update_target = if mode == UpdateMode::Selective {
                name_to_id
                    .get(&spec.name)
                    .and_then(|id| existing.iter().find(|t| t.id == *id))
                    .filter(|t| !t.is_completed())
            } else {
                None
            };

            let task = match update_target {
                Some(original) => {
                    // In-place update: keep id, creation time, and status.
                    let mut updated = original.clone();
                    updated.name = spec.name.clone();
                    updated.description = spec.description.clone();
                    updated.notes = spec.notes.clone();
                    updated.implementation_guide = spec.implementation_guide.clone();
                    updated.verification_criteria = spec.verification_criteria.clone();
                    updated.analysis_result = global_analysis_result.clone();
                    if spec.related_files.is_some() {
                        updated.related_files = spec.related_files.clone();
                    }
                    updated.updated_at = now;
                    updated
                }
                None => {
                    let mut task = Task::new(spec.name.clone(), spec.description.clone());
                    task.notes = spec.notes.clone();
                    task.status = TaskStatus::Pending;
                    task.related_files = spec.related_files.clone();
                    task.implementation_guide = spec.implementation_guide.clone();
                    task.verification_criteria = spec.verification_criteria.clone();
                    task.analysis_result = global_analysis_result.clone();
                    task.created_at = now;
                    task.updated_at = now;
                    task
                }
            };

            // Record the mapping as tasks are created, in spec order, so a
            // later spec in the same batch can depend on an earlier one by
            // name.
            name_to_id.insert(task.name.clone(), task.id);
            new_tasks.push(task);
        }

        // Resolve dependency tokens against everything that will exist after
        // the operation. A spec without tokens leaves an updated task's
        // previous dependencies in place.
        let known_ids: HashSet<Uuid> = tasks_to_keep
            .iter()
            .chain(new_tasks.iter())
            .map(|t| t.id)
            .collect();
        for (spec, task) in specs.iter().zip(new_tasks.iter_mut()) {
            if !spec.dependencies.is_empty() {
                task.dependencies = deps::resolve_dependencies(
                    &spec.dependencies,
                    &name_to_id,
                    &known_ids,
                    Some(task.id),
                );
            }
        }

        let mut all_tasks = tasks_to_keep;
        all_tasks.extend(new_tasks.iter().cloned());
        self.save(&all_tasks).await?;

        Ok(new_tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::temp_store;

    fn spec(name: &str, description: &str) -> TaskSpec {
        TaskSpec {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Seed the store with A (pending) and B (completed); returns their IDs.
    async fn seed(store: &TaskStore) -> (Uuid, Uuid) {
        let a = store.create("A", "existing pending", None, vec![], None).await.unwrap();
        let b = store.create("B", "existing completed", None, vec![], None).await.unwrap();
        store
            .update_status(b.id, TaskStatus::Completed)
            .await
            .unwrap();
        (a.id, b.id)
    }

    #[tokio::test]
    async fn append_keeps_everything() {
        let (_dir, store) = temp_store();
        let (a_id, b_id) = seed(&store).await;

        let created = store
            .batch_create_or_update(
                &[spec("A", "new A"), spec("C", "new C")],
                UpdateMode::Append,
                None,
            )
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        let all = store.load().await.unwrap();
        assert_eq!(all.len(), 4);
        let old_a = all.iter().find(|t| t.id == a_id).unwrap();
        assert_eq!(old_a.description, "existing pending");
        assert!(all.iter().any(|t| t.id == b_id));
    }

    #[tokio::test]
    async fn overwrite_keeps_only_completed() {
        let (_dir, store) = temp_store();
        let (a_id, b_id) = seed(&store).await;

        let created = store
            .batch_create_or_update(
                &[spec("A", "new A"), spec("C", "new C")],
                UpdateMode::Overwrite,
                None,
            )
            .await
            .unwrap();

        let all = store.load().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(!all.iter().any(|t| t.id == a_id));
        assert!(all.iter().any(|t| t.id == b_id));
        assert!(created.iter().any(|t| t.name == "A" && t.id != a_id));
    }

    #[tokio::test]
    async fn selective_updates_in_place_and_creates_the_rest() {
        let (_dir, store) = temp_store();
        let (a_id, b_id) = seed(&store).await;

        let created = store
            .batch_create_or_update(
                &[spec("A", "updated A"), spec("C", "new C")],
                UpdateMode::Selective,
                Some("shared analysis".into()),
            )
            .await
            .unwrap();

        let all = store.load().await.unwrap();
        assert_eq!(all.len(), 3);
        let updated_a = all.iter().find(|t| t.name == "A").unwrap();
        assert_eq!(updated_a.id, a_id, "in-place update keeps the id");
        assert_eq!(updated_a.description, "updated A");
        assert_eq!(updated_a.status, TaskStatus::Pending);
        assert_eq!(updated_a.analysis_result.as_deref(), Some("shared analysis"));
        assert!(all.iter().any(|t| t.id == b_id));
        assert_eq!(created.len(), 2);
    }

    #[tokio::test]
    async fn selective_leaves_untouched_tasks_alone() {
        let (_dir, store) = temp_store();
        let (a_id, _) = seed(&store).await;

        store
            .batch_create_or_update(&[spec("C", "new C")], UpdateMode::Selective, None)
            .await
            .unwrap();

        let all = store.load().await.unwrap();
        let old_a = all.iter().find(|t| t.id == a_id).unwrap();
        assert_eq!(old_a.description, "existing pending");
    }

    #[tokio::test]
    async fn selective_coexists_with_completed_name_match() {
        let (_dir, store) = temp_store();
        let (_, b_id) = seed(&store).await;

        let created = store
            .batch_create_or_update(&[spec("B", "fresh B")], UpdateMode::Selective, None)
            .await
            .unwrap();

        let all = store.load().await.unwrap();
        let completed = all.iter().find(|t| t.id == b_id).unwrap();
        assert_eq!(completed.description, "existing completed");
        assert_eq!(completed.status, TaskStatus::Completed);
        // The incoming spec became a fresh task sharing the name.
        assert_eq!(created.len(), 1);
        assert_ne!(created[0].id, b_id);
        assert_eq!(all.iter().filter(|t| t.name == "B").count(), 2);
    }

    #[tokio::test]
    async fn clear_all_tasks_archives_then_appends() {
        let (_dir, store) = temp_store();
        let (a_id, b_id) = seed(&store).await;

        let created = store
            .batch_create_or_update(
                &[spec("A", "new A"), spec("C", "new C")],
                UpdateMode::ClearAllTasks,
                None,
            )
            .await
            .unwrap();

        let all = store.load().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all.iter().any(|t| t.id == a_id));
        assert!(!all.iter().any(|t| t.id == b_id));
        assert_eq!(created.len(), 2);

        // The archive snapshot holds only the completed task B.
        let mut archives = Vec::new();
        let mut entries = tokio::fs::read_dir(store.config().memory_dir()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            archives.push(entry.path());
        }
        assert_eq!(archives.len(), 1);
        let raw = tokio::fs::read_to_string(&archives[0]).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let archived = parsed["tasks"].as_array().unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0]["id"], serde_json::json!(b_id));
    }

    #[tokio::test]
    async fn later_spec_can_depend_on_earlier_spec_by_name() {
        let (_dir, store) = temp_store();

        let mut second = spec("second", "depends on first");
        second.dependencies = vec!["first".into()];
        let created = store
            .batch_create_or_update(
                &[spec("first", "comes first"), second],
                UpdateMode::Append,
                None,
            )
            .await
            .unwrap();

        let first_id = created[0].id;
        assert_eq!(created[1].dependencies.len(), 1);
        assert_eq!(created[1].dependencies[0].task_id, first_id);
    }

    #[tokio::test]
    async fn unresolvable_dependency_tokens_are_dropped_not_fatal() {
        let (_dir, store) = temp_store();

        let mut only = spec("only", "dangling references");
        only.dependencies = vec!["nowhere".into(), Uuid::new_v4().to_string()];
        let created = store
            .batch_create_or_update(&[only], UpdateMode::Append, None)
            .await
            .unwrap();
        assert!(created[0].dependencies.is_empty());
    }
}
