//! Heuristic conflict detection over the loaded workspace, and the fixes
//! offered for each conflict.
//!
//! Detection is advisory: it looks only at what is in the document and
//! never blocks a save.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::gantt::position::{offset_days, task_dates_from_estimate, TaskDates};
use crate::gantt::timeline::week_start;
use crate::task::Task;

use super::allocation::{spare_capacity, weekly_utilization};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConflictKind {
    ScheduleOverlap,
    OverAllocation,
    EquipmentDoubleBooked,
    EquipmentUnavailable,
    SkillGap,
}

impl ConflictKind {
    pub fn label(self) -> &'static str {
        match self {
            ConflictKind::ScheduleOverlap => "schedule overlap",
            ConflictKind::OverAllocation => "over-allocation",
            ConflictKind::EquipmentDoubleBooked => "equipment double-booked",
            ConflictKind::EquipmentUnavailable => "equipment unavailable",
            ConflictKind::SkillGap => "skill gap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub description: String,
    pub task_ids: Vec<u64>,
    pub member_ids: Vec<u64>,
    pub equipment_ids: Vec<u64>,
    pub booking_ids: Vec<u64>,
    pub allocation_ids: Vec<u64>,
    pub week_start: Option<NaiveDate>,
}

impl Conflict {
    fn new(kind: ConflictKind, severity: Severity, description: String) -> Self {
        Conflict {
            kind,
            severity,
            description,
            task_ids: Vec::new(),
            member_ids: Vec::new(),
            equipment_ids: Vec::new(),
            booking_ids: Vec::new(),
            allocation_ids: Vec::new(),
            week_start: None,
        }
    }
}

/// Scan the workspace. Critical conflicts come first, then by kind.
pub fn detect_conflicts(db: &Database, today: NaiveDate) -> Vec<Conflict> {
    let mut out = Vec::new();
    schedule_overlaps(db, today, &mut out);
    over_allocations(db, &mut out);
    equipment_double_bookings(db, &mut out);
    equipment_unavailable(db, today, &mut out);
    skill_gaps(db, &mut out);
    out.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.kind.cmp(&b.kind)));
    out
}

fn member_name(db: &Database, id: u64) -> String {
    db.member(id).map(|m| m.name.clone()).unwrap_or_else(|| format!("#{id}"))
}

fn schedule_overlaps(db: &Database, today: NaiveDate, out: &mut Vec<Conflict>) {
    let open: Vec<(&Task, TaskDates)> = db
        .tasks
        .iter()
        .filter(|t| !t.is_completed() && !t.assignees.is_empty())
        .map(|t| (t, task_dates_from_estimate(t, today)))
        .collect();
    for (i, (a, da)) in open.iter().enumerate() {
        for (b, db_) in &open[i + 1..] {
            if !da.overlaps(db_) {
                continue;
            }
            let shared: Vec<u64> = a.assignees.iter().copied().filter(|m| b.assignees.contains(m)).collect();
            if shared.is_empty() {
                continue;
            }
            let names: Vec<String> = shared.iter().map(|m| member_name(db, *m)).collect();
            let mut c = Conflict::new(
                ConflictKind::ScheduleOverlap,
                Severity::Warning,
                format!("'{}' and '{}' overlap for {}", a.title, b.title, names.join(", ")),
            );
            c.task_ids = vec![a.id, b.id];
            c.member_ids = shared;
            out.push(c);
        }
    }
}

fn over_allocations(db: &Database, out: &mut Vec<Conflict>) {
    for load in weekly_utilization(&db.team_members, &db.allocations) {
        if !load.is_over_allocated() {
            continue;
        }
        let severity = if load.is_critical() { Severity::Critical } else { Severity::Warning };
        let mut c = Conflict::new(
            ConflictKind::OverAllocation,
            severity,
            format!(
                "{} is booked {:.1}h of {:.1}h in the week of {} ({:.0}%)",
                member_name(db, load.member_id),
                load.hours,
                load.capacity,
                load.week_start,
                load.percent()
            ),
        );
        c.member_ids = vec![load.member_id];
        c.week_start = Some(load.week_start);
        c.allocation_ids = db
            .allocations
            .iter()
            .filter(|a| a.team_member_id == load.member_id && week_start(a.week_start) == load.week_start)
            .map(|a| a.id)
            .collect();
        out.push(c);
    }
}

fn equipment_double_bookings(db: &Database, out: &mut Vec<Conflict>) {
    for (i, a) in db.bookings.iter().enumerate() {
        for b in &db.bookings[i + 1..] {
            if a.equipment_id != b.equipment_id || a.project_id == b.project_id || !a.overlaps(b) {
                continue;
            }
            let name = db
                .equipment_item(a.equipment_id)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| format!("#{}", a.equipment_id));
            let mut c = Conflict::new(
                ConflictKind::EquipmentDoubleBooked,
                Severity::Critical,
                format!(
                    "{name} is booked by projects {} and {} between {} and {}",
                    a.project_id,
                    b.project_id,
                    a.start_date.max(b.start_date),
                    a.end_date.min(b.end_date)
                ),
            );
            c.equipment_ids = vec![a.equipment_id];
            c.booking_ids = vec![a.id, b.id];
            out.push(c);
        }
    }
}

fn equipment_unavailable(db: &Database, today: NaiveDate, out: &mut Vec<Conflict>) {
    for booking in db.bookings.iter().filter(|b| b.covers(today)) {
        let Some(unit) = db.equipment_item(booking.equipment_id) else {
            continue;
        };
        if !unit.status.is_unavailable() {
            continue;
        }
        let mut c = Conflict::new(
            ConflictKind::EquipmentUnavailable,
            Severity::Warning,
            format!(
                "{} is booked for project {} but is {}",
                unit.name,
                booking.project_id,
                unit.status.label().to_lowercase()
            ),
        );
        c.equipment_ids = vec![unit.id];
        c.booking_ids = vec![booking.id];
        out.push(c);
    }
}

fn missing_skills(db: &Database, task: &Task) -> Vec<String> {
    task.required_skills
        .iter()
        .filter(|skill| {
            !task
                .assignees
                .iter()
                .filter_map(|id| db.member(*id))
                .any(|m| m.has_skill(skill))
        })
        .cloned()
        .collect()
}

fn skill_gaps(db: &Database, out: &mut Vec<Conflict>) {
    for task in db.tasks.iter().filter(|t| !t.is_completed() && !t.required_skills.is_empty()) {
        let missing = missing_skills(db, task);
        if missing.is_empty() {
            continue;
        }
        let mut c = Conflict::new(
            ConflictKind::SkillGap,
            Severity::Warning,
            format!("'{}' needs {} but no assignee has it", task.title, missing.join(", ")),
        );
        c.task_ids = vec![task.id];
        c.member_ids = task.assignees.clone();
        out.push(c);
    }
}

/// A concrete change that would clear a conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Swap `from` for `to` on a task, or add `to` when `from` is `None`.
    Reassign { task_id: u64, from: Option<u64>, to: u64 },
    ShiftTask { task_id: u64, start: NaiveDate, due: NaiveDate },
    CapAllocation { allocation_id: u64, hours: f64 },
    ShiftBooking { booking_id: u64, start: NaiveDate, end: NaiveDate },
}

impl Resolution {
    pub fn describe(&self, db: &Database) -> String {
        let task_title = |id: u64| db.task(id).map(|t| t.title.clone()).unwrap_or_else(|| format!("#{id}"));
        match self {
            Resolution::Reassign { task_id, from: Some(from), to } => format!(
                "Reassign '{}' from {} to {}",
                task_title(*task_id),
                member_name(db, *from),
                member_name(db, *to)
            ),
            Resolution::Reassign { task_id, from: None, to } => {
                format!("Add {} to '{}'", member_name(db, *to), task_title(*task_id))
            }
            Resolution::ShiftTask { task_id, start, due } => {
                format!("Move '{}' to {start}..{due}", task_title(*task_id))
            }
            Resolution::CapAllocation { allocation_id, hours } => {
                format!("Cap allocation {allocation_id} at {hours:.1}h")
            }
            Resolution::ShiftBooking { booking_id, start, end } => {
                format!("Move booking {booking_id} to {start}..{end}")
            }
        }
    }
}

/// Members that could take `task` off `busy`: every required skill, not
/// already on the task, and spare hours in the task's first week. Most
/// spare capacity first.
fn candidates_for(db: &Database, task: &Task, start: NaiveDate, exclude: &[u64]) -> Vec<u64> {
    let mut found: Vec<(f64, u64)> = db
        .team_members
        .iter()
        .filter(|m| !task.assignees.contains(&m.id) && !exclude.contains(&m.id))
        .filter(|m| task.required_skills.iter().all(|s| m.has_skill(s)))
        .map(|m| (spare_capacity(m, &db.allocations, start), m.id))
        .filter(|(spare, _)| *spare > 0.0)
        .collect();
    found.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    found.into_iter().map(|(_, id)| id).collect()
}

/// Candidate fixes for one conflict, best first. May be empty.
pub fn suggest_resolutions(conflict: &Conflict, db: &Database, today: NaiveDate) -> Vec<Resolution> {
    let mut out = Vec::new();
    match conflict.kind {
        ConflictKind::ScheduleOverlap => {
            let tasks: Vec<(&Task, TaskDates)> = conflict
                .task_ids
                .iter()
                .filter_map(|id| db.task(*id))
                .map(|t| (t, task_dates_from_estimate(t, today)))
                .collect();
            let [(first, first_dates), (second, second_dates)] = tasks.as_slice() else {
                return out;
            };
            let (earlier_dates, later, later_dates) =
                if (second_dates.start, second.id) >= (first_dates.start, first.id) {
                    (first_dates, second, second_dates)
                } else {
                    (second_dates, first, first_dates)
                };
            for busy in &conflict.member_ids {
                if let Some(to) = candidates_for(db, later, later_dates.start, &conflict.member_ids).first() {
                    out.push(Resolution::Reassign { task_id: later.id, from: Some(*busy), to: *to });
                }
            }
            let start = offset_days(earlier_dates.end, 1);
            out.push(Resolution::ShiftTask {
                task_id: later.id,
                start,
                due: offset_days(start, later_dates.duration_days()),
            });
        }
        ConflictKind::OverAllocation => {
            let Some(load) = conflict.member_ids.first().and_then(|member| {
                weekly_utilization(&db.team_members, &db.allocations)
                    .into_iter()
                    .find(|l| l.member_id == *member && Some(l.week_start) == conflict.week_start)
            }) else {
                return out;
            };
            let excess = load.hours - load.capacity;
            let mut allocs: Vec<_> = db
                .allocations
                .iter()
                .filter(|a| conflict.allocation_ids.contains(&a.id))
                .collect();
            allocs.sort_by(|a, b| b.hours.total_cmp(&a.hours).then(a.id.cmp(&b.id)));
            if let Some(largest) = allocs.first() {
                out.push(Resolution::CapAllocation {
                    allocation_id: largest.id,
                    hours: (largest.hours - excess).max(0.0),
                });
            }
        }
        ConflictKind::EquipmentDoubleBooked => {
            let bookings: Vec<_> = conflict
                .booking_ids
                .iter()
                .filter_map(|id| db.bookings.iter().find(|b| b.id == *id))
                .collect();
            if let [a, b] = bookings.as_slice() {
                let (earlier, later) = if (b.start_date, b.id) >= (a.start_date, a.id) { (a, b) } else { (b, a) };
                let start = earlier.end_date + Duration::days(1);
                out.push(Resolution::ShiftBooking {
                    booking_id: later.id,
                    start,
                    end: start + (later.end_date - later.start_date),
                });
            }
        }
        ConflictKind::SkillGap => {
            if let Some(task) = conflict.task_ids.first().and_then(|id| db.task(*id)) {
                let start = task_dates_from_estimate(task, today).start;
                if let Some(to) = candidates_for(db, task, start, &[]).first() {
                    out.push(Resolution::Reassign { task_id: task.id, from: None, to: *to });
                }
            }
        }
        ConflictKind::EquipmentUnavailable => {}
    }
    out
}

/// Apply a resolution to the document in place.
pub fn apply_resolution(db: &mut Database, resolution: &Resolution) -> AppResult<()> {
    match resolution {
        Resolution::Reassign { task_id, from, to } => {
            db.require_member(*to)?;
            let task = db
                .task_mut(*task_id)
                .ok_or(AppError::NotFound { entity: "task", id: *task_id })?;
            let mut assignees: BTreeSet<u64> = task.assignees.iter().copied().collect();
            if let Some(from) = from {
                assignees.remove(from);
            }
            assignees.insert(*to);
            task.assignees = assignees.into_iter().collect();
        }
        Resolution::ShiftTask { task_id, start, due } => {
            let task = db
                .task_mut(*task_id)
                .ok_or(AppError::NotFound { entity: "task", id: *task_id })?;
            task.start_date = Some(*start);
            task.due_date = Some(*due);
        }
        Resolution::CapAllocation { allocation_id, hours } => {
            let alloc = db
                .allocations
                .iter_mut()
                .find(|a| a.id == *allocation_id)
                .ok_or(AppError::NotFound { entity: "allocation", id: *allocation_id })?;
            alloc.hours = *hours;
        }
        Resolution::ShiftBooking { booking_id, start, end } => {
            let booking = db
                .bookings
                .iter_mut()
                .find(|b| b.id == *booking_id)
                .ok_or(AppError::NotFound { entity: "booking", id: *booking_id })?;
            booking.start_date = *start;
            booking.end_date = *end;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::{ResourceAllocation, TeamMember};
    use crate::equipment::{Equipment, EquipmentBooking};
    use crate::fields::{EquipmentStatus, TaskStatus};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn member(id: u64, skills: &[&str]) -> TeamMember {
        TeamMember {
            id,
            name: format!("Crew {id}"),
            role: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            weekly_capacity_hours: 40.0,
        }
    }

    fn task(id: u64, start: NaiveDate, due: NaiveDate, assignees: &[u64]) -> Task {
        let mut t = Task::new(id, format!("Task {id}"), 0);
        t.start_date = Some(start);
        t.due_date = Some(due);
        t.assignees = assignees.to_vec();
        t
    }

    fn unit(id: u64, status: EquipmentStatus) -> Equipment {
        Equipment {
            id,
            name: format!("Crane {id}"),
            equipment_type: "crane".into(),
            status,
            project_id: None,
            operators: vec![],
            maintenance_due: None,
            maintenance_interval_days: None,
        }
    }

    fn booking(id: u64, equipment: u64, project: u64, start: NaiveDate, end: NaiveDate) -> EquipmentBooking {
        EquipmentBooking { id, equipment_id: equipment, project_id: project, start_date: start, end_date: end }
    }

    #[test]
    fn overlapping_tasks_with_shared_crew() {
        let mut db = Database::default();
        db.team_members = vec![member(1, &[]), member(2, &[])];
        db.tasks = vec![
            task(1, d(2024, 3, 11), d(2024, 3, 14), &[1]),
            task(2, d(2024, 3, 13), d(2024, 3, 15), &[1, 2]),
            task(3, d(2024, 3, 13), d(2024, 3, 15), &[2]),
        ];
        let mut done = task(4, d(2024, 3, 11), d(2024, 3, 14), &[1]);
        done.status = TaskStatus::Completed;
        db.tasks.push(done);

        let conflicts = detect_conflicts(&db, d(2024, 3, 1));
        let overlaps: Vec<_> = conflicts.iter().filter(|c| c.kind == ConflictKind::ScheduleOverlap).collect();
        assert_eq!(overlaps.len(), 2);
        assert_eq!(overlaps[0].task_ids, vec![1, 2]);
        assert_eq!(overlaps[0].member_ids, vec![1]);
        assert_eq!(overlaps[1].task_ids, vec![2, 3]);
    }

    #[test]
    fn over_allocation_severity_and_cap() {
        let mut db = Database::default();
        db.team_members = vec![member(1, &[])];
        db.allocations = vec![
            ResourceAllocation { id: 1, project_id: 1, team_member_id: 1, week_start: d(2024, 3, 10), hours: 30.0 },
            ResourceAllocation { id: 2, project_id: 2, team_member_id: 1, week_start: d(2024, 3, 10), hours: 15.0 },
            ResourceAllocation { id: 3, project_id: 1, team_member_id: 1, week_start: d(2024, 3, 17), hours: 60.0 },
        ];
        let conflicts = detect_conflicts(&db, d(2024, 3, 1));
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].severity, Severity::Critical);
        assert_eq!(conflicts[0].week_start, Some(d(2024, 3, 17)));
        assert_eq!(conflicts[1].severity, Severity::Warning);
        assert_eq!(conflicts[1].allocation_ids, vec![1, 2]);

        let fixes = suggest_resolutions(&conflicts[1], &db, d(2024, 3, 1));
        assert_eq!(fixes, vec![Resolution::CapAllocation { allocation_id: 1, hours: 25.0 }]);
        apply_resolution(&mut db, &fixes[0]).unwrap();
        assert!(detect_conflicts(&db, d(2024, 3, 1)).iter().all(|c| c.week_start != Some(d(2024, 3, 10))));
    }

    #[test]
    fn equipment_double_booking_across_projects_only() {
        let mut db = Database::default();
        db.equipment = vec![unit(1, EquipmentStatus::InUse)];
        db.bookings = vec![
            booking(1, 1, 10, d(2024, 3, 4), d(2024, 3, 8)),
            booking(2, 1, 11, d(2024, 3, 7), d(2024, 3, 9)),
            booking(3, 1, 10, d(2024, 3, 7), d(2024, 3, 8)),
        ];
        let conflicts = detect_conflicts(&db, d(2024, 3, 1));
        let doubles: Vec<_> = conflicts.iter().filter(|c| c.kind == ConflictKind::EquipmentDoubleBooked).collect();
        assert_eq!(doubles.len(), 2);
        assert!(doubles.iter().all(|c| c.severity == Severity::Critical));

        let fixes = suggest_resolutions(doubles[0], &db, d(2024, 3, 1));
        assert_eq!(fixes, vec![Resolution::ShiftBooking { booking_id: 2, start: d(2024, 3, 9), end: d(2024, 3, 11) }]);
    }

    #[test]
    fn booking_on_equipment_in_the_shop() {
        let mut db = Database::default();
        db.equipment = vec![unit(1, EquipmentStatus::Maintenance)];
        db.bookings = vec![booking(1, 1, 10, d(2024, 3, 4), d(2024, 3, 8))];
        let today_conflicts = detect_conflicts(&db, d(2024, 3, 5));
        assert_eq!(today_conflicts.len(), 1);
        assert_eq!(today_conflicts[0].kind, ConflictKind::EquipmentUnavailable);
        assert!(suggest_resolutions(&today_conflicts[0], &db, d(2024, 3, 5)).is_empty());
        assert!(detect_conflicts(&db, d(2024, 3, 20)).is_empty());
    }

    #[test]
    fn skill_gap_suggests_a_qualified_member() {
        let mut db = Database::default();
        db.team_members = vec![member(1, &["carpentry"]), member(2, &["welding"]), member(3, &["Welding"])];
        db.allocations = vec![ResourceAllocation { id: 1, project_id: 1, team_member_id: 2, week_start: d(2024, 3, 10), hours: 38.0 }];
        let mut t = task(1, d(2024, 3, 11), d(2024, 3, 12), &[1]);
        t.required_skills = vec!["welding".into()];
        db.tasks = vec![t];

        let conflicts = detect_conflicts(&db, d(2024, 3, 1));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::SkillGap);
        let fixes = suggest_resolutions(&conflicts[0], &db, d(2024, 3, 1));
        assert_eq!(fixes[0], Resolution::Reassign { task_id: 1, from: None, to: 3 });
        apply_resolution(&mut db, &fixes[0]).unwrap();
        assert_eq!(db.tasks[0].assignees, vec![1, 3]);
        assert!(detect_conflicts(&db, d(2024, 3, 1)).is_empty());
    }

    #[test]
    fn overlap_fixes_reassign_or_shift_the_later_task() {
        let mut db = Database::default();
        db.team_members = vec![member(1, &[]), member(2, &[])];
        db.tasks = vec![
            task(1, d(2024, 3, 11), d(2024, 3, 13), &[1]),
            task(2, d(2024, 3, 12), d(2024, 3, 14), &[1]),
        ];
        let conflicts = detect_conflicts(&db, d(2024, 3, 1));
        let fixes = suggest_resolutions(&conflicts[0], &db, d(2024, 3, 1));
        assert_eq!(
            fixes,
            vec![
                Resolution::Reassign { task_id: 2, from: Some(1), to: 2 },
                Resolution::ShiftTask { task_id: 2, start: d(2024, 3, 14), due: d(2024, 3, 16) },
            ]
        );
        assert!(fixes[0].describe(&db).contains("from Crew 1 to Crew 2"));
        apply_resolution(&mut db, &fixes[1]).unwrap();
        assert!(detect_conflicts(&db, d(2024, 3, 1)).is_empty());
    }
}
