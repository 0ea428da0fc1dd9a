//! Task module - the task data model and complexity assessment.
//!
//! Types here mirror the persisted JSON exactly; pure functions are kept
//! separate from IO (the store owns all file access).

pub mod complexity;
mod types;

pub use complexity::{assess, ComplexityAssessment, ComplexityLevel, ComplexityMetrics};
pub use types::{RelatedFile, RelatedFileType, Task, TaskDependency, TaskStatus};
