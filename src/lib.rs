//! # Taskboard
//!
//! A persistent task-tracking backend for AI coding agents.
//!
//! This library provides:
//! - A JSON-file task store with status lifecycle and dependency tracking
//! - A batch reconciliation engine with four update modes
//! - Complexity assessment and execution-readiness checks
//! - Search across live tasks and archived memory snapshots
//!
//! ## Task Flow
//! 1. Plan a goal with `plan_task`
//! 2. Submit atomic tasks with `split_tasks`
//! 3. Execute schedulable tasks with `execute_task`
//! 4. Verify and complete them with `verify_task`
//!
//! ## Modules
//! - `config`: data directory resolution
//! - `task`: task model and complexity assessment
//! - `deps`: dependency token resolution and execution checks
//! - `store`: persistence, reconciliation, and search
//! - `tools`: the RPC tool surface

pub mod config;
pub mod deps;
pub mod store;
pub mod task;
pub mod tools;

pub use config::Config;
pub use store::TaskStore;
