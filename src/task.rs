//! Planning records: projects, tasks and the dependencies between them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A construction project that tasks, allocations and bookings hang off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// A schedulable work item shown as a bar on the Gantt chart.
///
/// Either date may be missing; the chart infers the displayed range from
/// whatever is present plus `estimated_hours`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,
    #[serde(default)]
    pub project_id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub progress: u8,
    /// Team member ids.
    #[serde(default)]
    pub assignees: Vec<u64>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// A bare task with only a title, as created by the quick-add dialog.
    pub fn new(id: u64, title: impl Into<String>, now_utc: i64) -> Self {
        Task {
            id,
            project_id: None,
            title: title.into(),
            status: TaskStatus::NotStarted,
            priority: Priority::Medium,
            category: None,
            start_date: None,
            due_date: None,
            estimated_hours: None,
            progress: 0,
            assignees: Vec::new(),
            required_skills: Vec::new(),
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        }
    }

    pub fn is_milestone(&self) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("milestone"))
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Whether two tasks have at least one assignee in common.
    pub fn shares_assignee_with(&self, other: &Task) -> bool {
        self.assignees.iter().any(|a| other.assignees.contains(a))
    }
}

/// An edge `predecessor -> successor` in the schedule graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDependency {
    pub id: u64,
    pub predecessor_id: u64,
    pub successor_id: u64,
    #[serde(default)]
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub lag_days: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_is_category_based() {
        let mut t = Task::new(1, "Topping out", 0);
        assert!(!t.is_milestone());
        t.category = Some("Milestone".into());
        assert!(t.is_milestone());
    }

    #[test]
    fn missing_optional_fields_deserialise_to_defaults() {
        let t: Task = serde_json::from_str(
            r#"{"id":3,"title":"Pour slab","created_at_utc":0,"updated_at_utc":0}"#,
        )
        .unwrap();
        assert_eq!(t.status, TaskStatus::NotStarted);
        assert_eq!(t.priority, Priority::Medium);
        assert!(t.assignees.is_empty());
        assert_eq!(t.start_date, None);
    }

    #[test]
    fn shared_assignee_detection() {
        let mut a = Task::new(1, "Frame walls", 0);
        let mut b = Task::new(2, "Hang drywall", 0);
        a.assignees = vec![10, 11];
        b.assignees = vec![12];
        assert!(!a.shares_assignee_with(&b));
        b.assignees.push(11);
        assert!(a.shares_assignee_with(&b));
    }
}
