//! Search and retrieval across the live task set and the archive.
//!
//! Keyword queries split on whitespace; a task matches when every token
//! appears (case-insensitive substring) in at least one searchable field.
//! Archive snapshots are scanned in-process: files are enumerated
//! newest-first by name (names embed a sortable UTC timestamp) and at most
//! [`MAX_ARCHIVE_FILES`] are opened per query.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::task::Task;

/// Upper bound on archive files opened for a single query.
const MAX_ARCHIVE_FILES: usize = 10;

/// Pagination metadata reported alongside a result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_results: usize,
    pub has_more: bool,
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

fn matches(task: &Task, query: &str, is_id: bool) -> bool {
    if is_id {
        return task.id.to_string() == query;
    }
    let keywords: Vec<String> = query
        .split_whitespace()
        .map(|k| k.to_lowercase())
        .collect();
    if keywords.is_empty() {
        return true;
    }
    let haystacks = [
        Some(task.name.as_str()),
        Some(task.description.as_str()),
        task.notes.as_deref(),
        task.implementation_guide.as_deref(),
        task.summary.as_deref(),
    ];
    keywords.iter().all(|keyword| {
        haystacks
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(keyword))
    })
}

/// Completed tasks first (latest completion first), then incomplete tasks by
/// latest update.
fn recency_order(a: &Task, b: &Task) -> Ordering {
    match (a.completed_at, b.completed_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.updated_at.cmp(&a.updated_at),
    }
}

impl TaskStore {
    /// Search the live set and the archive by ID or keywords, merged,
    /// recency-ordered, and paginated. Live entries win over archive entries
    /// sharing the same ID.
    pub async fn search(
        &self,
        query: &str,
        is_id: bool,
        page: usize,
        page_size: usize,
    ) -> Result<SearchPage, StoreError> {
        let current_tasks = self.load().await?;

        let mut by_id: HashMap<Uuid, Task> = HashMap::new();
        for task in current_tasks
            .into_iter()
            .filter(|t| matches(t, query, is_id))
        {
            by_id.insert(task.id, task);
        }

        for task in self.scan_archive(query, is_id).await? {
            by_id.entry(task.id).or_insert(task);
        }

        let mut all_tasks: Vec<Task> = by_id.into_values().collect();
        all_tasks.sort_by(recency_order);

        let total_results = all_tasks.len();
        let page_size = page_size.max(1);
        let total_pages = total_results.div_ceil(page_size);
        let current_page = page.clamp(1, total_pages.max(1));
        let start = (current_page - 1) * page_size;
        let end = (start + page_size).min(total_results);
        let tasks = if start < total_results {
            all_tasks[start..end].to_vec()
        } else {
            Vec::new()
        };

        Ok(SearchPage {
            tasks,
            pagination: Pagination {
                current_page,
                total_pages: total_pages.max(1),
                total_results,
                has_more: current_page < total_pages,
            },
        })
    }

    /// Scan archive snapshots for matching tasks, newest files first, capped
    /// at [`MAX_ARCHIVE_FILES`]. Unreadable snapshots are skipped.
    async fn scan_archive(&self, query: &str, is_id: bool) -> Result<Vec<Task>, StoreError> {
        let memory_dir = self.config().memory_dir();
        if !memory_dir.exists() {
            return Ok(Vec::new());
        }

        let mut file_names: Vec<String> = Vec::new();
        let mut entries = tokio::fs::read_dir(&memory_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") {
                file_names.push(name);
            }
        }
        file_names.sort_by(|a, b| b.cmp(a));
        file_names.truncate(MAX_ARCHIVE_FILES);

        let mut found = Vec::new();
        for name in file_names {
            let path = memory_dir.join(&name);
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("Skipping unreadable archive {}: {}", path.display(), e);
                    continue;
                }
            };
            let snapshot: super::TaskFile = match serde_json::from_str(&contents) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Skipping corrupt archive {}: {}", path.display(), e);
                    continue;
                }
            };
            found.extend(
                snapshot
                    .tasks
                    .into_iter()
                    .filter(|t| matches(t, query, is_id)),
            );
        }
        Ok(found)
    }
}
