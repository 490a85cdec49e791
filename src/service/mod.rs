//! The workspace service: every change to the planner goes through here.
//!
//! A mutation runs against the in-memory document, is saved through the
//! repository, and is rolled back in memory if either step fails, so the
//! caller never sees a half-applied change.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::crew::DEFAULT_WEEKLY_CAPACITY;
use crate::config::DEFAULT_MAINTENANCE_HORIZON_DAYS;
use crate::db::{Database, Repository};
use crate::error::AppResult;

pub mod planning;
pub mod resources;
pub mod stakeholders;

pub use planning::{ProjectDraft, TaskDraft, TaskPatch};
pub use resources::{AllocationDraft, EquipmentDraft, MemberDraft};
pub use stakeholders::{AssignmentDraft, InteractionDraft, RatingDraft, StakeholderDraft, StakeholderPatch};

pub struct Workspace<R: Repository> {
    repo: R,
    db: Database,
    today: NaiveDate,
    weekly_capacity: f64,
    maintenance_horizon_days: i64,
}

impl<R: Repository> Workspace<R> {
    pub fn open(repo: R, today: NaiveDate) -> AppResult<Self> {
        let db = repo.load()?;
        debug!(
            tasks = db.tasks.len(),
            stakeholders = db.stakeholders.len(),
            "workspace opened"
        );
        Ok(Workspace {
            repo,
            db,
            today,
            weekly_capacity: DEFAULT_WEEKLY_CAPACITY,
            maintenance_horizon_days: DEFAULT_MAINTENANCE_HORIZON_DAYS,
        })
    }

    /// Default capacity for new team members.
    pub fn with_weekly_capacity(mut self, hours: f64) -> Self {
        self.weekly_capacity = hours;
        self
    }

    pub fn with_maintenance_horizon(mut self, days: i64) -> Self {
        self.maintenance_horizon_days = days;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn maintenance_horizon_days(&self) -> i64 {
        self.maintenance_horizon_days
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Discard in-memory state and read the repository again.
    pub fn reload(&mut self) -> AppResult<()> {
        self.db = self.repo.load()?;
        Ok(())
    }

    /// Apply `f`, then save. On any error the document is restored to its
    /// state before the call.
    fn mutate<T>(&mut self, action: &str, f: impl FnOnce(&mut Database) -> AppResult<T>) -> AppResult<T> {
        let before = self.db.clone();
        let result = f(&mut self.db).and_then(|value| {
            self.repo.save(&self.db)?;
            Ok(value)
        });
        if let Err(e) = &result {
            if e.is_validation() {
                debug!(action, error = %e, "change rejected");
            } else {
                warn!(action, error = %e, "change failed, rolled back");
            }
            self.db = before;
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::NaiveDate;

    use crate::db::{Database, MemoryRepository};

    use super::Workspace;

    pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Empty in-memory workspace with today fixed to Wed 2024-03-13.
    pub fn workspace() -> Workspace<MemoryRepository> {
        Workspace::open(MemoryRepository::with(Database::default()), d(2024, 3, 13)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::error::AppError;

    #[test]
    fn failed_save_rolls_back() {
        let mut ws = workspace();
        ws.create_project(ProjectDraft { name: "Riverside Library".into(), ..Default::default() }).unwrap();
        ws.repository().set_fail_saves(true);
        let err = ws
            .create_task(TaskDraft { title: "Strip topsoil".into(), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert!(ws.db().tasks.is_empty());
        assert_eq!(ws.repository().snapshot().projects.len(), 1);
    }

    #[test]
    fn validation_failure_leaves_document_untouched() {
        let mut ws = workspace();
        let before = ws.db().clone();
        assert!(ws.create_task(TaskDraft::default()).is_err());
        assert_eq!(ws.db(), &before);
    }

    #[test]
    fn reload_reads_repository() {
        let mut ws = workspace();
        ws.create_project(ProjectDraft { name: "Depot".into(), ..Default::default() }).unwrap();
        ws.reload().unwrap();
        assert_eq!(ws.db().projects.len(), 1);
    }
}
