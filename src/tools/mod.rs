//! Tool implementations exposed to agents.
//!
//! Each tool takes a validated, typed argument object (deserialized from the
//! incoming JSON and checked against the same rules the outer schema
//! enforces) and returns a textual result. Domain refusals that should be
//! flagged as errors to the caller are returned as `Err`; informational
//! outcomes are `Ok` text.

mod manage;
mod plan;
mod query;
mod split;
mod workflow;

pub use manage::{ClearAllTasks, DeleteTask, UpdateTask};
pub use plan::PlanTask;
pub use query::{GetTaskDetail, ListTasks, QueryTask};
pub use split::SplitTasks;
pub use workflow::{ExecuteTask, VerifyTask};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::store::TaskStore;

/// A tool an agent can invoke against the task store.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as exposed over the RPC boundary.
    fn name(&self) -> &str;

    /// Human-readable description for tool discovery.
    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn parameters_schema(&self) -> Value;

    /// Execute with already-parsed JSON arguments.
    async fn execute(&self, args: Value, store: &TaskStore) -> anyhow::Result<String>;
}

/// The full tool registry.
pub fn tool_set() -> HashMap<String, Arc<dyn Tool>> {
    let mut tools: HashMap<String, Arc<dyn Tool>> = HashMap::new();

    tools.insert("plan_task".to_string(), Arc::new(PlanTask));
    tools.insert("split_tasks".to_string(), Arc::new(SplitTasks));
    tools.insert("list_tasks".to_string(), Arc::new(ListTasks));
    tools.insert("execute_task".to_string(), Arc::new(ExecuteTask));
    tools.insert("verify_task".to_string(), Arc::new(VerifyTask));
    tools.insert("query_task".to_string(), Arc::new(QueryTask));
    tools.insert("get_task_detail".to_string(), Arc::new(GetTaskDetail));
    tools.insert("update_task".to_string(), Arc::new(UpdateTask));
    tools.insert("delete_task".to_string(), Arc::new(DeleteTask));
    tools.insert("clear_all_tasks".to_string(), Arc::new(ClearAllTasks));

    tools
}
