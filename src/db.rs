//! Workspace document, storage backends and shared parsing/formatting helpers.
//!
//! The whole workspace lives in one JSON document. Callers never touch the
//! file directly: they go through a [`Repository`], so the planner logic is
//! decoupled from where the records are kept.

use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Days, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crew::{ResourceAllocation, TeamMember};
use crate::equipment::{Equipment, EquipmentBooking, MaintenanceRecord};
use crate::error::{AppError, AppResult};
use crate::stakeholder::{ContactInteraction, PerformanceRating, Stakeholder, StakeholderAssignment};
use crate::task::{Project, Task, TaskDependency};

/// In-memory copy of every table in the workspace.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct Database {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub dependencies: Vec<TaskDependency>,
    #[serde(default)]
    pub team_members: Vec<TeamMember>,
    #[serde(default)]
    pub allocations: Vec<ResourceAllocation>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub bookings: Vec<EquipmentBooking>,
    #[serde(default)]
    pub maintenance: Vec<MaintenanceRecord>,
    #[serde(default)]
    pub stakeholders: Vec<Stakeholder>,
    #[serde(default)]
    pub assignments: Vec<StakeholderAssignment>,
    #[serde(default)]
    pub interactions: Vec<ContactInteraction>,
    #[serde(default)]
    pub ratings: Vec<PerformanceRating>,
}

fn next_id<T>(items: &[T], id: impl Fn(&T) -> u64) -> u64 {
    items.iter().map(id).max().unwrap_or(0) + 1
}

impl Database {
    pub fn next_project_id(&self) -> u64 {
        next_id(&self.projects, |p| p.id)
    }

    pub fn next_task_id(&self) -> u64 {
        next_id(&self.tasks, |t| t.id)
    }

    pub fn next_dependency_id(&self) -> u64 {
        next_id(&self.dependencies, |d| d.id)
    }

    pub fn next_member_id(&self) -> u64 {
        next_id(&self.team_members, |m| m.id)
    }

    pub fn next_allocation_id(&self) -> u64 {
        next_id(&self.allocations, |a| a.id)
    }

    pub fn next_equipment_id(&self) -> u64 {
        next_id(&self.equipment, |e| e.id)
    }

    pub fn next_booking_id(&self) -> u64 {
        next_id(&self.bookings, |b| b.id)
    }

    pub fn next_maintenance_id(&self) -> u64 {
        next_id(&self.maintenance, |m| m.id)
    }

    pub fn next_stakeholder_id(&self) -> u64 {
        next_id(&self.stakeholders, |s| s.id)
    }

    pub fn next_assignment_id(&self) -> u64 {
        next_id(&self.assignments, |a| a.id)
    }

    pub fn next_interaction_id(&self) -> u64 {
        next_id(&self.interactions, |i| i.id)
    }

    pub fn next_rating_id(&self) -> u64 {
        next_id(&self.ratings, |r| r.id)
    }

    pub fn project(&self, id: u64) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn member(&self, id: u64) -> Option<&TeamMember> {
        self.team_members.iter().find(|m| m.id == id)
    }

    pub fn equipment_item(&self, id: u64) -> Option<&Equipment> {
        self.equipment.iter().find(|e| e.id == id)
    }

    pub fn equipment_mut(&mut self, id: u64) -> Option<&mut Equipment> {
        self.equipment.iter_mut().find(|e| e.id == id)
    }

    pub fn stakeholder(&self, id: u64) -> Option<&Stakeholder> {
        self.stakeholders.iter().find(|s| s.id == id)
    }

    pub fn stakeholder_mut(&mut self, id: u64) -> Option<&mut Stakeholder> {
        self.stakeholders.iter_mut().find(|s| s.id == id)
    }

    /// Look up a task or fail with `NotFound`.
    pub fn require_task(&self, id: u64) -> AppResult<&Task> {
        self.task(id).ok_or(AppError::NotFound { entity: "task", id })
    }

    pub fn require_project(&self, id: u64) -> AppResult<&Project> {
        self.project(id).ok_or(AppError::NotFound { entity: "project", id })
    }

    pub fn require_member(&self, id: u64) -> AppResult<&TeamMember> {
        self.member(id).ok_or(AppError::NotFound { entity: "team member", id })
    }

    pub fn require_equipment(&self, id: u64) -> AppResult<&Equipment> {
        self.equipment_item(id).ok_or(AppError::NotFound { entity: "equipment", id })
    }

    pub fn require_stakeholder(&self, id: u64) -> AppResult<&Stakeholder> {
        self.stakeholder(id).ok_or(AppError::NotFound { entity: "stakeholder", id })
    }

    /// Tasks belonging to one project, or all tasks when `project` is `None`.
    pub fn tasks_in(&self, project: Option<u64>) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| project.is_none() || t.project_id == project)
            .collect()
    }
}

/// Read/write access to the workspace document.
pub trait Repository {
    fn load(&self) -> AppResult<Database>;
    fn save(&self, db: &Database) -> AppResult<()>;
}

/// Workspace stored as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileRepository { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Repository for JsonFileRepository {
    /// A missing file is an empty workspace; an unreadable one is an error.
    fn load(&self) -> AppResult<Database> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "workspace file missing, starting empty");
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(&self.path)?.read_to_string(&mut buf)?;
        let db = serde_json::from_str(&buf)?;
        debug!(path = %self.path.display(), "workspace loaded");
        Ok(db)
    }

    /// Atomic-ish write via temp file + rename.
    fn save(&self, db: &Database) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(db)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        debug!(path = %self.path.display(), "workspace saved");
        Ok(())
    }
}

/// Repository held entirely in memory. Saves can be made to fail so callers
/// can exercise their error paths.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    db: RefCell<Database>,
    fail_saves: Cell<bool>,
}

impl MemoryRepository {
    pub fn with(db: Database) -> Self {
        MemoryRepository {
            db: RefCell::new(db),
            fail_saves: Cell::new(false),
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    pub fn snapshot(&self) -> Database {
        self.db.borrow().clone()
    }
}

impl Repository for MemoryRepository {
    fn load(&self) -> AppResult<Database> {
        Ok(self.db.borrow().clone())
    }

    fn save(&self, db: &Database) -> AppResult<()> {
        if self.fail_saves.get() {
            return Err(io::Error::other("save rejected").into());
        }
        *self.db.borrow_mut() = db.clone();
        Ok(())
    }
}

/// Normalise a skill or specialty: trimmed, lowercase, spaces as hyphens.
pub fn normalise_label(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "-")
}

/// Split comma-separated inputs, normalise, sort and dedup.
pub fn split_and_normalise_labels(inputs: &[String]) -> Vec<String> {
    let mut labels = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let label = normalise_label(part);
            if !label.is_empty() {
                labels.push(label);
            }
        }
    }
    labels.sort();
    labels.dedup();
    labels
}

/// Split comma-separated numeric ids, ignoring blanks.
pub fn parse_id_list(inputs: &[String]) -> AppResult<Vec<u64>> {
    let mut ids = Vec::new();
    for raw in inputs {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id = part
                .parse::<u64>()
                .map_err(|_| AppError::invalid(format!("'{part}' is not a valid id")))?;
            ids.push(id);
        }
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Parse a human date relative to `today`.
///
/// Supports `today`, `tomorrow`, `yesterday`, `in Nd` / `in Nw`,
/// `next <weekday>`, `end of month` and `YYYY-MM-DD`.
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        "yesterday" => return today.pred_opt(),
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            return NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.pred_opt());
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(n) = rest.strip_suffix('d').and_then(|n| n.trim().parse::<i64>().ok()) {
            return TimeDelta::try_days(n).and_then(|delta| today.checked_add_signed(delta));
        }
        if let Some(n) = rest.strip_suffix('w').and_then(|n| n.trim().parse::<i64>().ok()) {
            return TimeDelta::try_weeks(n).and_then(|delta| today.checked_add_signed(delta));
        }
    }

    if let Some(day) = s.strip_prefix("next ") {
        let weekdays = ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];
        if let Some(target) = weekdays.iter().position(|w| *w == day || w.starts_with(day) && day.len() >= 3) {
            let current = today.weekday().num_days_from_monday() as i64;
            let mut ahead = (target as i64 + 7 - current) % 7;
            if ahead == 0 {
                ahead = 7;
            }
            return today.checked_add_days(Days::new(ahead as u64));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Like [`parse_date_input`] but reports unparseable input as a validation error.
pub fn require_date(field: &str, s: &str, today: NaiveDate) -> AppResult<NaiveDate> {
    parse_date_input(s, today).ok_or_else(|| AppError::invalid(format!("{field}: cannot parse date '{s}'")))
}

/// Format a date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_relative(date: Option<NaiveDate>, today: NaiveDate) -> String {
    match date {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            match delta {
                0 => "today".into(),
                1 => "tomorrow".into(),
                n if n > 1 => format!("in {n}d"),
                n => format!("{}d late", -n),
            }
        }
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn next_ids_start_at_one() {
        let mut db = Database::default();
        assert_eq!(db.next_task_id(), 1);
        db.tasks.push(Task::new(5, "Excavate", 0));
        assert_eq!(db.next_task_id(), 6);
    }

    #[test]
    fn file_repository_round_trips_and_treats_missing_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("nested").join("workspace.json"));
        assert_eq!(repo.load().unwrap(), Database::default());

        let mut db = Database::default();
        db.tasks.push(Task::new(1, "Survey site", 0));
        repo.save(&db).unwrap();
        assert_eq!(repo.load().unwrap(), db);
        assert!(!repo.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error_not_an_empty_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileRepository::new(&path).load().unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
    }

    #[test]
    fn memory_repository_can_fail_saves() {
        let repo = MemoryRepository::default();
        repo.set_fail_saves(true);
        assert!(repo.save(&Database::default()).is_err());
    }

    #[test]
    fn parses_relative_dates() {
        let today = d(2024, 3, 13); // Wednesday
        assert_eq!(parse_date_input("today", today), Some(today));
        assert_eq!(parse_date_input("in 3d", today), Some(d(2024, 3, 16)));
        assert_eq!(parse_date_input("in 2w", today), Some(d(2024, 3, 27)));
        assert_eq!(parse_date_input("next monday", today), Some(d(2024, 3, 18)));
        assert_eq!(parse_date_input("next wed", today), Some(d(2024, 3, 20)));
        assert_eq!(parse_date_input("eom", today), Some(d(2024, 3, 31)));
        assert_eq!(parse_date_input("2024-12-01", today), Some(d(2024, 12, 1)));
        assert_eq!(parse_date_input("someday", today), None);
    }

    #[test]
    fn out_of_range_relative_dates_are_rejected() {
        let today = d(2024, 3, 13);
        assert_eq!(parse_date_input("in 100000000d", today), None);
        assert_eq!(parse_date_input("in -100000000d", today), None);
        assert_eq!(parse_date_input("in 9223372036854775807w", today), None);
        assert_eq!(parse_date_input("tomorrow", NaiveDate::MAX), None);
        assert_eq!(parse_date_input("next monday", NaiveDate::MAX), None);
        assert!(require_date("due", "in 100000000d", today).is_err());
    }

    #[test]
    fn labels_are_normalised_and_deduped() {
        let labels = split_and_normalise_labels(&["Concrete, welding".into(), " concrete ".into(), "Heavy Lift".into()]);
        assert_eq!(labels, vec!["concrete", "heavy-lift", "welding"]);
    }

    #[test]
    fn id_lists_reject_garbage() {
        assert_eq!(parse_id_list(&["3,1".into(), "3".into()]).unwrap(), vec![1, 3]);
        assert!(parse_id_list(&["x".into()]).is_err());
    }

    #[test]
    fn relative_formatting() {
        let today = d(2024, 3, 13);
        assert_eq!(format_relative(Some(today), today), "today");
        assert_eq!(format_relative(Some(d(2024, 3, 10)), today), "3d late");
        assert_eq!(format_relative(None, today), "-");
        assert_eq!(truncate("Formwork and rebar", 8), "Formwor…");
    }
}
