//! Projects, tasks, rescheduling and dependencies.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::db::{split_and_normalise_labels, Database, Repository};
use crate::error::{AppError, AppResult};
use crate::fields::{DependencyType, Priority, TaskStatus};
use crate::gantt::dependency::{check_new_dependency, DependencyRejection};
use crate::gantt::drag::{rescheduled_dates, validate_drag, DragContext, DragValidation};
use crate::gantt::position::MAX_ESTIMATED_HOURS;
use crate::task::{Project, Task, TaskDependency};
use crate::validate::Checks;

use super::Workspace;

#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub name: String,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub project_id: Option<u64>,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub progress: u8,
    pub assignees: Vec<u64>,
    pub required_skills: Vec<String>,
}

/// Partial task update. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub project_id: Option<u64>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub clear_start: bool,
    pub clear_due: bool,
    pub estimated_hours: Option<f64>,
    pub progress: Option<u8>,
    pub assignees: Option<Vec<u64>>,
    pub required_skills: Option<Vec<String>>,
}

fn check_task(db: &Database, task: &Task) -> AppResult<()> {
    let mut checks = Checks::new();
    checks
        .non_empty("title", &task.title)
        .date_order("start date", task.start_date, "due date", task.due_date)
        .range("progress", Some(f64::from(task.progress)), 0.0, 100.0)
        .positive("estimated hours", task.estimated_hours)
        .require(
            !task.estimated_hours.is_some_and(|h| h > MAX_ESTIMATED_HOURS),
            format!("estimated hours must be at most {MAX_ESTIMATED_HOURS}"),
        );
    if let Some(project) = task.project_id {
        checks.require(db.project(project).is_some(), format!("project {project} does not exist"));
    }
    for member in &task.assignees {
        checks.require(db.member(*member).is_some(), format!("team member {member} does not exist"));
    }
    checks.finish()
}

/// Completed work is always shown fully progressed.
fn normalise_progress(task: &mut Task) {
    if task.status == TaskStatus::Completed {
        task.progress = 100;
    }
}

impl<R: Repository> Workspace<R> {
    pub fn create_project(&mut self, draft: ProjectDraft) -> AppResult<u64> {
        Checks::new()
            .non_empty("name", &draft.name)
            .date_order("start date", draft.start_date, "end date", draft.end_date)
            .finish()?;
        let id = self.mutate("create project", |db| {
            let id = db.next_project_id();
            db.projects.push(Project {
                id,
                name: draft.name.trim().to_string(),
                location: draft.location.filter(|l| !l.trim().is_empty()),
                start_date: draft.start_date,
                end_date: draft.end_date,
            });
            Ok(id)
        })?;
        info!(project_id = id, "project created");
        Ok(id)
    }

    pub fn create_task(&mut self, draft: TaskDraft) -> AppResult<u64> {
        let now = Utc::now().timestamp();
        let id = self.mutate("create task", |db| {
            let mut task = Task::new(db.next_task_id(), draft.title.trim(), now);
            task.project_id = draft.project_id;
            task.status = draft.status;
            task.priority = draft.priority;
            task.category = draft.category.filter(|c| !c.trim().is_empty());
            task.start_date = draft.start_date;
            task.due_date = draft.due_date;
            task.estimated_hours = draft.estimated_hours;
            task.progress = draft.progress;
            task.assignees = draft.assignees;
            task.assignees.sort_unstable();
            task.assignees.dedup();
            task.required_skills = split_and_normalise_labels(&draft.required_skills);
            normalise_progress(&mut task);
            check_task(db, &task)?;
            let id = task.id;
            db.tasks.push(task);
            Ok(id)
        })?;
        info!(task_id = id, "task created");
        Ok(id)
    }

    pub fn update_task(&mut self, id: u64, patch: TaskPatch) -> AppResult<()> {
        let now = Utc::now().timestamp();
        self.mutate("update task", |db| {
            let mut task = db.require_task(id)?.clone();
            if let Some(title) = patch.title {
                task.title = title.trim().to_string();
            }
            if let Some(project) = patch.project_id {
                task.project_id = Some(project);
            }
            if let Some(status) = patch.status {
                task.status = status;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(category) = patch.category {
                task.category = Some(category).filter(|c| !c.trim().is_empty());
            }
            if patch.clear_start {
                task.start_date = None;
            }
            if patch.clear_due {
                task.due_date = None;
            }
            if let Some(start) = patch.start_date {
                task.start_date = Some(start);
            }
            if let Some(due) = patch.due_date {
                task.due_date = Some(due);
            }
            if let Some(hours) = patch.estimated_hours {
                task.estimated_hours = Some(hours);
            }
            if let Some(progress) = patch.progress {
                task.progress = progress;
            }
            if let Some(mut assignees) = patch.assignees {
                assignees.sort_unstable();
                assignees.dedup();
                task.assignees = assignees;
            }
            if let Some(skills) = patch.required_skills {
                task.required_skills = split_and_normalise_labels(&skills);
            }
            normalise_progress(&mut task);
            check_task(db, &task)?;
            task.updated_at_utc = now;
            if let Some(slot) = db.task_mut(id) {
                *slot = task;
            }
            Ok(())
        })?;
        info!(task_id = id, "task updated");
        Ok(())
    }

    /// Check a drop of `task_id` at `proposed` against the given chart
    /// range without changing anything.
    pub fn preview_move(&self, task_id: u64, proposed: Option<NaiveDate>, range: (NaiveDate, NaiveDate)) -> AppResult<DragValidation> {
        let task = self.db.require_task(task_id)?;
        let ctx = DragContext {
            timeline_start: range.0,
            timeline_end: range.1,
            tasks: &self.db.tasks,
            today: self.today,
        };
        Ok(validate_drag(task, proposed, &ctx))
    }

    /// Reschedule a task so it starts on `proposed`, keeping its length.
    ///
    /// Invalid moves are refused with every reason; warnings are returned
    /// to the caller and the move goes ahead.
    pub fn move_task(&mut self, task_id: u64, proposed: Option<NaiveDate>, range: (NaiveDate, NaiveDate)) -> AppResult<DragValidation> {
        let validation = self.preview_move(task_id, proposed, range)?;
        let Some(new_start) = proposed.filter(|_| validation.is_allowed()) else {
            debug!(task_id, reasons = ?validation.messages, "move refused");
            return Err(AppError::InvalidDrag(validation.messages));
        };
        let today = self.today;
        let now = Utc::now().timestamp();
        let (start, due) = self.mutate("move task", |db| {
            let task = db
                .task_mut(task_id)
                .ok_or(AppError::NotFound { entity: "task", id: task_id })?;
            let (start, due) = rescheduled_dates(task, new_start, today);
            task.start_date = Some(start);
            task.due_date = Some(due);
            task.updated_at_utc = now;
            Ok((start, due))
        })?;
        info!(task_id, %start, %due, validity = validation.validity.label(), "task moved");
        Ok(validation)
    }

    pub fn add_dependency(&mut self, predecessor: u64, successor: u64, kind: DependencyType, lag_days: i64) -> AppResult<u64> {
        let id = self.mutate("add dependency", |db| {
            check_new_dependency(&db.tasks, &db.dependencies, predecessor, successor).map_err(|rejection| match rejection {
                DependencyRejection::SelfDependency | DependencyRejection::Cycle => {
                    AppError::DependencyCycle { predecessor, successor }
                }
                DependencyRejection::UnknownTask(id) => AppError::NotFound { entity: "task", id },
                DependencyRejection::Duplicate => AppError::invalid(rejection.message()),
            })?;
            let id = db.next_dependency_id();
            db.dependencies.push(TaskDependency {
                id,
                predecessor_id: predecessor,
                successor_id: successor,
                dependency_type: kind,
                lag_days,
            });
            Ok(id)
        })?;
        info!(dependency_id = id, predecessor, successor, kind = kind.label(), "dependency added");
        Ok(id)
    }

    pub fn remove_dependency(&mut self, id: u64) -> AppResult<()> {
        self.mutate("remove dependency", |db| {
            let before = db.dependencies.len();
            db.dependencies.retain(|d| d.id != id);
            if db.dependencies.len() == before {
                return Err(AppError::NotFound { entity: "dependency", id });
            }
            Ok(())
        })?;
        info!(dependency_id = id, "dependency removed");
        Ok(())
    }
}
