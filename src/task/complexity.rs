//! Task complexity assessment.
//!
//! A pure function of a task's textual and structural metrics. The result is
//! advisory only: it feeds execution guidance text and never drives control
//! flow.

use serde::{Deserialize, Serialize};

use super::Task;

/// Complexity tier of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    LowComplexity,
    MediumComplexity,
    HighComplexity,
    VeryHighComplexity,
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowComplexity => write!(f, "low complexity"),
            Self::MediumComplexity => write!(f, "medium complexity"),
            Self::HighComplexity => write!(f, "high complexity"),
            Self::VeryHighComplexity => write!(f, "very high complexity"),
        }
    }
}

/// Fixed thresholds for each metric family. A metric at or above a threshold
/// ratchets the level up; it never lowers it.
pub mod thresholds {
    pub const DESCRIPTION_MEDIUM: usize = 500;
    pub const DESCRIPTION_HIGH: usize = 1000;
    pub const DESCRIPTION_VERY_HIGH: usize = 2000;

    pub const DEPENDENCIES_MEDIUM: usize = 2;
    pub const DEPENDENCIES_HIGH: usize = 5;
    pub const DEPENDENCIES_VERY_HIGH: usize = 10;

    pub const NOTES_MEDIUM: usize = 200;
    pub const NOTES_HIGH: usize = 500;
    pub const NOTES_VERY_HIGH: usize = 1000;
}

/// Raw metric values the assessment was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityMetrics {
    pub description_length: usize,
    pub dependencies_count: usize,
    pub notes_length: usize,
    pub has_notes: bool,
}

/// Result of assessing a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityAssessment {
    pub level: ComplexityLevel,
    pub metrics: ComplexityMetrics,
    pub recommendations: Vec<String>,
}

fn tier(value: usize, medium: usize, high: usize, very_high: usize) -> ComplexityLevel {
    if value >= very_high {
        ComplexityLevel::VeryHighComplexity
    } else if value >= high {
        ComplexityLevel::HighComplexity
    } else if value >= medium {
        ComplexityLevel::MediumComplexity
    } else {
        ComplexityLevel::LowComplexity
    }
}

/// Assess a task's complexity from its description, dependency count, and
/// notes. The final level is the maximum tier triggered across the three
/// metric families.
pub fn assess(task: &Task) -> ComplexityAssessment {
    use thresholds::*;

    let metrics = ComplexityMetrics {
        description_length: task.description.chars().count(),
        dependencies_count: task.dependencies.len(),
        notes_length: task.notes.as_deref().map_or(0, |n| n.chars().count()),
        has_notes: task.notes.is_some(),
    };

    let level = tier(
        metrics.description_length,
        DESCRIPTION_MEDIUM,
        DESCRIPTION_HIGH,
        DESCRIPTION_VERY_HIGH,
    )
    .max(tier(
        metrics.dependencies_count,
        DEPENDENCIES_MEDIUM,
        DEPENDENCIES_HIGH,
        DEPENDENCIES_VERY_HIGH,
    ))
    .max(tier(
        metrics.notes_length,
        NOTES_MEDIUM,
        NOTES_HIGH,
        NOTES_VERY_HIGH,
    ));

    let mut recommendations = Vec::new();
    match level {
        ComplexityLevel::LowComplexity => {
            recommendations.push("This task has low complexity and can be executed directly".into());
            recommendations
                .push("Set clear completion standards so acceptance is unambiguous".into());
        }
        ComplexityLevel::MediumComplexity => {
            recommendations
                .push("This task has medium complexity; plan the execution steps in detail".into());
            recommendations.push(
                "Execute in phases and check progress regularly to keep the implementation on track"
                    .into(),
            );
            if metrics.dependencies_count > 0 {
                recommendations.push(
                    "Check the completion status and output quality of all dependent tasks".into(),
                );
            }
        }
        ComplexityLevel::HighComplexity => {
            recommendations
                .push("This task has high complexity; plan the execution steps in detail".into());
            recommendations
                .push("Consider breaking the task into smaller, independent subtasks".into());
            recommendations.push(
                "Establish clear milestones and checkpoints for progress tracking and quality control"
                    .into(),
            );
            if metrics.dependencies_count > DEPENDENCIES_MEDIUM {
                recommendations.push(
                    "There are many dependent tasks; map the dependency relationships to ensure the correct execution order"
                        .into(),
                );
            }
        }
        ComplexityLevel::VeryHighComplexity => {
            recommendations.push(
                "This task has very high complexity; splitting it into multiple independent tasks is strongly recommended"
                    .into(),
            );
            recommendations.push(
                "Analyze and plan thoroughly before execution, defining the scope and interface of each subtask"
                    .into(),
            );
            recommendations
                .push("Assess the risks, identify likely obstacles, and prepare countermeasures".into());
            recommendations.push(
                "Establish concrete testing and validation standards for each subtask".into(),
            );
            if metrics.description_length >= DESCRIPTION_VERY_HIGH {
                recommendations.push(
                    "The description is very long; organize the key points into a structured execution list"
                        .into(),
                );
            }
            if metrics.dependencies_count >= DEPENDENCIES_HIGH {
                recommendations.push(
                    "There are too many dependent tasks; re-evaluate the task boundaries".into(),
                );
            }
        }
    }

    ComplexityAssessment {
        level,
        metrics,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDependency;
    use uuid::Uuid;

    fn task_with(description_len: usize, deps: usize, notes_len: usize) -> Task {
        let mut task = Task::new("t", "x".repeat(description_len));
        task.dependencies = (0..deps)
            .map(|_| TaskDependency {
                task_id: Uuid::new_v4(),
            })
            .collect();
        if notes_len > 0 {
            task.notes = Some("n".repeat(notes_len));
        }
        task
    }

    #[test]
    fn short_simple_task_is_low() {
        let assessment = assess(&task_with(100, 0, 0));
        assert_eq!(assessment.level, ComplexityLevel::LowComplexity);
        assert!(!assessment.metrics.has_notes);
    }

    #[test]
    fn long_description_dominates() {
        // 2500-char description, one dependency, no notes.
        let assessment = assess(&task_with(2500, 1, 0));
        assert_eq!(assessment.level, ComplexityLevel::VeryHighComplexity);
        assert_eq!(assessment.metrics.description_length, 2500);
    }

    #[test]
    fn dependency_count_dominates() {
        // Short description, 6 dependencies, short notes.
        let assessment = assess(&task_with(100, 6, 50));
        assert_eq!(assessment.level, ComplexityLevel::HighComplexity);
    }

    #[test]
    fn level_is_maximum_across_families() {
        let assessment = assess(&task_with(600, 0, 1200));
        // Description says medium, notes say very high; highest wins.
        assert_eq!(assessment.level, ComplexityLevel::VeryHighComplexity);
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(
            assess(&task_with(500, 0, 0)).level,
            ComplexityLevel::MediumComplexity
        );
        assert_eq!(
            assess(&task_with(0, 2, 0)).level,
            ComplexityLevel::MediumComplexity
        );
        assert_eq!(
            assess(&task_with(0, 0, 200)).level,
            ComplexityLevel::MediumComplexity
        );
    }

    #[test]
    fn very_high_gets_targeted_extras() {
        let assessment = assess(&task_with(2500, 5, 0));
        assert_eq!(assessment.level, ComplexityLevel::VeryHighComplexity);
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.contains("description is very long")));
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.contains("too many dependent tasks")));
    }
}
