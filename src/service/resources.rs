//! Crew, allocations, equipment and conflict resolution.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::crew::{ResourceAllocation, TeamMember};
use crate::db::{split_and_normalise_labels, Repository};
use crate::equipment::{Equipment, EquipmentBooking, MaintenanceRecord};
use crate::error::{AppError, AppResult};
use crate::fields::EquipmentStatus;
use crate::gantt::timeline::week_start;
use crate::resources::allocation::{weekly_utilization, WeeklyLoad};
use crate::resources::conflict::{apply_resolution, detect_conflicts, suggest_resolutions, Conflict, Resolution};
use crate::resources::maintenance::{self, check_status_transition, MaintenanceDue};
use crate::validate::Checks;

use super::Workspace;

/// Hours in a week; no allocation can exceed it.
const HOURS_PER_WEEK: f64 = 168.0;

#[derive(Debug, Clone, Default)]
pub struct MemberDraft {
    pub name: String,
    pub role: Option<String>,
    pub skills: Vec<String>,
    pub weekly_capacity_hours: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AllocationDraft {
    pub project_id: u64,
    pub team_member_id: u64,
    /// Any day in the week; snapped to the Sunday it starts on.
    pub week: NaiveDate,
    pub hours: f64,
}

#[derive(Debug, Clone, Default)]
pub struct EquipmentDraft {
    pub name: String,
    pub equipment_type: String,
    pub status: EquipmentStatus,
    pub project_id: Option<u64>,
    pub operators: Vec<u64>,
    pub maintenance_due: Option<NaiveDate>,
    pub maintenance_interval_days: Option<i64>,
}

impl<R: Repository> Workspace<R> {
    pub fn add_member(&mut self, draft: MemberDraft) -> AppResult<u64> {
        let capacity = draft.weekly_capacity_hours.unwrap_or(self.weekly_capacity);
        Checks::new()
            .non_empty("name", &draft.name)
            .range("weekly capacity", Some(capacity), 1.0, HOURS_PER_WEEK)
            .finish()?;
        let id = self.mutate("add member", |db| {
            let id = db.next_member_id();
            db.team_members.push(TeamMember {
                id,
                name: draft.name.trim().to_string(),
                role: draft.role.filter(|r| !r.trim().is_empty()),
                skills: split_and_normalise_labels(&draft.skills),
                weekly_capacity_hours: capacity,
            });
            Ok(id)
        })?;
        info!(member_id = id, "team member added");
        Ok(id)
    }

    /// Book hours for a member on a project. An existing allocation for the
    /// same project, member and week is replaced.
    pub fn allocate(&mut self, draft: AllocationDraft) -> AppResult<u64> {
        Checks::new()
            .range("hours", Some(draft.hours), 0.0, HOURS_PER_WEEK)
            .finish()?;
        let week = week_start(draft.week);
        let id = self.mutate("allocate", |db| {
            db.require_project(draft.project_id)?;
            db.require_member(draft.team_member_id)?;
            if let Some(existing) = db.allocations.iter_mut().find(|a| {
                a.project_id == draft.project_id && a.team_member_id == draft.team_member_id && a.week_start == week
            }) {
                existing.hours = draft.hours;
                return Ok(existing.id);
            }
            let id = db.next_allocation_id();
            db.allocations.push(ResourceAllocation {
                id,
                project_id: draft.project_id,
                team_member_id: draft.team_member_id,
                week_start: week,
                hours: draft.hours,
            });
            Ok(id)
        })?;
        info!(allocation_id = id, member_id = draft.team_member_id, %week, hours = draft.hours, "allocation saved");
        if let Some(load) = self.load_for(draft.team_member_id, week) {
            if load.is_over_allocated() {
                warn!(member_id = load.member_id, %week, hours = load.hours, capacity = load.capacity, "member over-allocated");
            }
        }
        Ok(id)
    }

    pub fn remove_allocation(&mut self, id: u64) -> AppResult<()> {
        self.mutate("remove allocation", |db| {
            let before = db.allocations.len();
            db.allocations.retain(|a| a.id != id);
            if db.allocations.len() == before {
                return Err(AppError::NotFound { entity: "allocation", id });
            }
            Ok(())
        })?;
        info!(allocation_id = id, "allocation removed");
        Ok(())
    }

    pub fn utilization(&self) -> Vec<WeeklyLoad> {
        weekly_utilization(&self.db.team_members, &self.db.allocations)
    }

    fn load_for(&self, member_id: u64, week: NaiveDate) -> Option<WeeklyLoad> {
        self.utilization()
            .into_iter()
            .find(|l| l.member_id == member_id && l.week_start == week)
    }

    pub fn add_equipment(&mut self, draft: EquipmentDraft) -> AppResult<u64> {
        let mut checks = Checks::new();
        checks
            .non_empty("name", &draft.name)
            .non_empty("type", &draft.equipment_type);
        if let Some(days) = draft.maintenance_interval_days {
            checks.require(days > 0, "maintenance interval must be at least one day");
        }
        checks.finish()?;
        let id = self.mutate("add equipment", |db| {
            if let Some(project) = draft.project_id {
                db.require_project(project)?;
            }
            for op in &draft.operators {
                db.require_member(*op)?;
            }
            let id = db.next_equipment_id();
            db.equipment.push(Equipment {
                id,
                name: draft.name.trim().to_string(),
                equipment_type: draft.equipment_type.trim().to_string(),
                status: draft.status,
                project_id: draft.project_id,
                operators: draft.operators,
                maintenance_due: draft.maintenance_due,
                maintenance_interval_days: draft.maintenance_interval_days,
            });
            Ok(id)
        })?;
        info!(equipment_id = id, "equipment added");
        Ok(id)
    }

    pub fn set_equipment_status(&mut self, id: u64, status: EquipmentStatus) -> AppResult<()> {
        self.mutate("set equipment status", |db| {
            let unit = db
                .equipment_mut(id)
                .ok_or(AppError::NotFound { entity: "equipment", id })?;
            check_status_transition(unit.status, status)?;
            unit.status = status;
            Ok(())
        })?;
        info!(equipment_id = id, status = status.label(), "equipment status changed");
        Ok(())
    }

    /// Reserve equipment for a project. Clashes are reported by conflict
    /// detection, not refused here.
    pub fn book_equipment(&mut self, equipment_id: u64, project_id: u64, start: NaiveDate, end: NaiveDate) -> AppResult<u64> {
        Checks::new()
            .date_order("start date", Some(start), "end date", Some(end))
            .finish()?;
        let id = self.mutate("book equipment", |db| {
            db.require_equipment(equipment_id)?;
            db.require_project(project_id)?;
            let id = db.next_booking_id();
            db.bookings.push(EquipmentBooking {
                id,
                equipment_id,
                project_id,
                start_date: start,
                end_date: end,
            });
            Ok(id)
        })?;
        info!(booking_id = id, equipment_id, project_id, %start, %end, "equipment booked");
        Ok(id)
    }

    /// Add a maintenance record. The unit's due date moves up if this visit
    /// is sooner.
    pub fn schedule_maintenance(&mut self, equipment_id: u64, date: NaiveDate, description: &str) -> AppResult<u64> {
        Checks::new().non_empty("description", description).finish()?;
        let id = self.mutate("schedule maintenance", |db| {
            let id = db.next_maintenance_id();
            let unit = db
                .equipment_mut(equipment_id)
                .ok_or(AppError::NotFound { entity: "equipment", id: equipment_id })?;
            if unit.maintenance_due.map_or(true, |due| due > date) {
                unit.maintenance_due = Some(date);
            }
            db.maintenance.push(MaintenanceRecord {
                id,
                equipment_id,
                scheduled_date: date,
                description: description.trim().to_string(),
                completed_on: None,
            });
            Ok(id)
        })?;
        info!(maintenance_id = id, equipment_id, %date, "maintenance scheduled");
        Ok(id)
    }

    pub fn complete_maintenance(&mut self, record_id: u64, completed_on: NaiveDate) -> AppResult<()> {
        self.mutate("complete maintenance", |db| {
            let record = db
                .maintenance
                .iter_mut()
                .find(|m| m.id == record_id)
                .ok_or(AppError::NotFound { entity: "maintenance record", id: record_id })?;
            let unit = db
                .equipment
                .iter_mut()
                .find(|e| e.id == record.equipment_id)
                .ok_or(AppError::NotFound { entity: "equipment", id: record.equipment_id })?;
            maintenance::complete_maintenance(unit, record, completed_on)
        })?;
        info!(maintenance_id = record_id, %completed_on, "maintenance completed");
        Ok(())
    }

    pub fn maintenance_due(&self) -> Vec<MaintenanceDue> {
        maintenance::maintenance_due(&self.db.equipment, self.today, self.maintenance_horizon_days)
    }

    pub fn conflicts(&self) -> Vec<Conflict> {
        detect_conflicts(&self.db, self.today)
    }

    pub fn resolutions_for(&self, conflict: &Conflict) -> Vec<Resolution> {
        suggest_resolutions(conflict, &self.db, self.today)
    }

    /// Apply suggestion `choice` of conflict `index`, both as listed by
    /// [`Workspace::conflicts`] and [`Workspace::resolutions_for`].
    pub fn resolve_conflict(&mut self, index: usize, choice: usize) -> AppResult<Resolution> {
        let conflicts = self.conflicts();
        let conflict = conflicts
            .get(index)
            .ok_or_else(|| AppError::invalid(format!("no conflict number {}", index + 1)))?;
        let resolution = self
            .resolutions_for(conflict)
            .into_iter()
            .nth(choice)
            .ok_or_else(|| AppError::invalid(format!("conflict {} has no fix number {}", index + 1, choice + 1)))?;
        self.mutate("resolve conflict", |db| apply_resolution(db, &resolution))?;
        info!(kind = conflict.kind.label(), fix = ?resolution, "conflict resolved");
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{ProjectDraft, TaskDraft};
    use super::*;
    use crate::resources::conflict::ConflictKind;

    fn project(ws: &mut Workspace<crate::db::MemoryRepository>) -> u64 {
        ws.create_project(ProjectDraft { name: "Harbour Tower".into(), ..Default::default() }).unwrap()
    }

    #[test]
    fn allocations_snap_to_week_and_replace() {
        let mut ws = workspace();
        let p = project(&mut ws);
        let m = ws.add_member(MemberDraft { name: "Sam".into(), ..Default::default() }).unwrap();
        let first = ws.allocate(AllocationDraft { project_id: p, team_member_id: m, week: d(2024, 3, 13), hours: 20.0 }).unwrap();
        let again = ws.allocate(AllocationDraft { project_id: p, team_member_id: m, week: d(2024, 3, 15), hours: 45.0 }).unwrap();
        assert_eq!(first, again);
        assert_eq!(ws.db().allocations.len(), 1);
        assert_eq!(ws.db().allocations[0].week_start, d(2024, 3, 10));
        assert!(ws.utilization()[0].is_over_allocated());
        assert!(ws.allocate(AllocationDraft { project_id: 42, team_member_id: m, week: d(2024, 3, 13), hours: 1.0 }).is_err());
        assert!(ws.allocate(AllocationDraft { project_id: p, team_member_id: m, week: d(2024, 3, 13), hours: -1.0 }).is_err());
    }

    #[test]
    fn member_capacity_defaults_from_workspace() {
        let mut ws = workspace().with_weekly_capacity(32.0);
        let m = ws.add_member(MemberDraft { name: "Ari".into(), skills: vec!["Rigging".into()], ..Default::default() }).unwrap();
        let member = ws.db().member(m).unwrap();
        assert_eq!(member.weekly_capacity_hours, 32.0);
        assert_eq!(member.skills, vec!["rigging"]);
    }

    #[test]
    fn equipment_status_rules_apply() {
        let mut ws = workspace();
        let e = ws
            .add_equipment(EquipmentDraft {
                name: "Tower crane".into(),
                equipment_type: "crane".into(),
                status: EquipmentStatus::OutOfService,
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(ws.set_equipment_status(e, EquipmentStatus::InUse), Err(AppError::InvalidTransition { .. })));
        ws.set_equipment_status(e, EquipmentStatus::Available).unwrap();
        ws.set_equipment_status(e, EquipmentStatus::InUse).unwrap();
        assert_eq!(ws.db().equipment_item(e).unwrap().status, EquipmentStatus::InUse);
    }

    #[test]
    fn maintenance_cycle() {
        let mut ws = workspace();
        let e = ws
            .add_equipment(EquipmentDraft {
                name: "Loader".into(),
                equipment_type: "loader".into(),
                maintenance_due: Some(d(2024, 4, 30)),
                maintenance_interval_days: Some(30),
                ..Default::default()
            })
            .unwrap();
        assert!(ws.maintenance_due().is_empty());
        let rec = ws.schedule_maintenance(e, d(2024, 3, 20), "Oil change").unwrap();
        assert_eq!(ws.maintenance_due().len(), 1);
        ws.set_equipment_status(e, EquipmentStatus::Maintenance).unwrap();
        ws.complete_maintenance(rec, d(2024, 3, 21)).unwrap();
        let unit = ws.db().equipment_item(e).unwrap();
        assert_eq!(unit.status, EquipmentStatus::Available);
        assert_eq!(unit.maintenance_due, Some(d(2024, 4, 20)));
        assert!(ws.complete_maintenance(rec, d(2024, 3, 22)).is_err());
    }

    #[test]
    fn bookings_require_ordered_dates_and_known_ids() {
        let mut ws = workspace();
        let p = project(&mut ws);
        let e = ws
            .add_equipment(EquipmentDraft { name: "Pump".into(), equipment_type: "pump".into(), ..Default::default() })
            .unwrap();
        assert!(ws.book_equipment(e, p, d(2024, 3, 20), d(2024, 3, 18)).is_err());
        assert!(ws.book_equipment(e, 77, d(2024, 3, 18), d(2024, 3, 20)).is_err());
        ws.book_equipment(e, p, d(2024, 3, 18), d(2024, 3, 20)).unwrap();
        assert_eq!(ws.db().bookings.len(), 1);
    }

    #[test]
    fn resolve_conflict_applies_the_chosen_fix() {
        let mut ws = workspace();
        let a = ws.add_member(MemberDraft { name: "Jo".into(), ..Default::default() }).unwrap();
        ws.add_member(MemberDraft { name: "Lee".into(), ..Default::default() }).unwrap();
        for (title, start, due) in [("Formwork", d(2024, 3, 18), d(2024, 3, 20)), ("Rebar", d(2024, 3, 19), d(2024, 3, 21))] {
            ws.create_task(TaskDraft {
                title: title.into(),
                start_date: Some(start),
                due_date: Some(due),
                assignees: vec![a],
                ..Default::default()
            })
            .unwrap();
        }
        let conflicts = ws.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::ScheduleOverlap);
        assert!(ws.resolve_conflict(0, 5).is_err());
        let applied = ws.resolve_conflict(0, 1).unwrap();
        assert!(matches!(applied, Resolution::ShiftTask { task_id: 2, .. }));
        assert!(ws.conflicts().is_empty());
        assert!(ws.resolve_conflict(0, 0).is_err());
    }
}
