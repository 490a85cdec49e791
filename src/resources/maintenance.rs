//! Equipment status rules and the maintenance schedule.

use chrono::{Duration, NaiveDate};

use crate::equipment::{Equipment, EquipmentBooking, MaintenanceRecord};
use crate::error::{AppError, AppResult};
use crate::fields::EquipmentStatus;

/// Out-of-service equipment must be returned to `available` before it can
/// be put back to work.
pub fn check_status_transition(from: EquipmentStatus, to: EquipmentStatus) -> AppResult<()> {
    if from == EquipmentStatus::OutOfService && to == EquipmentStatus::InUse {
        return Err(AppError::InvalidTransition {
            entity: "equipment",
            from: from.label().to_string(),
            to: to.label().to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceDue {
    pub equipment_id: u64,
    pub name: String,
    pub due: NaiveDate,
    /// Negative when the due date is still ahead.
    pub days_overdue: i64,
}

impl MaintenanceDue {
    pub fn is_overdue(&self) -> bool {
        self.days_overdue > 0
    }
}

/// Equipment whose maintenance is overdue or due within `horizon_days`,
/// soonest first. Out-of-service units are left out.
pub fn maintenance_due(equipment: &[Equipment], today: NaiveDate, horizon_days: i64) -> Vec<MaintenanceDue> {
    let horizon = today + Duration::days(horizon_days.max(0));
    let mut due: Vec<MaintenanceDue> = equipment
        .iter()
        .filter(|e| e.status != EquipmentStatus::OutOfService)
        .filter_map(|e| {
            let date = e.maintenance_due?;
            (date <= horizon).then(|| MaintenanceDue {
                equipment_id: e.id,
                name: e.name.clone(),
                due: date,
                days_overdue: (today - date).num_days(),
            })
        })
        .collect();
    due.sort_by_key(|d| (d.due, d.equipment_id));
    due
}

/// Close out a maintenance record: the unit becomes available and the next
/// due date moves forward by the service interval, if one is set.
pub fn complete_maintenance(equipment: &mut Equipment, record: &mut MaintenanceRecord, completed_on: NaiveDate) -> AppResult<()> {
    if record.completed_on.is_some() {
        return Err(AppError::invalid(format!("maintenance record {} is already completed", record.id)));
    }
    if record.equipment_id != equipment.id {
        return Err(AppError::invalid(format!(
            "maintenance record {} belongs to equipment {}",
            record.id, record.equipment_id
        )));
    }
    record.completed_on = Some(completed_on);
    equipment.status = EquipmentStatus::Available;
    equipment.maintenance_due = equipment
        .maintenance_interval_days
        .filter(|days| *days > 0)
        .map(|days| completed_on + Duration::days(days));
    Ok(())
}

/// Whether the unit can be booked on `date`: not in the shop and not
/// already booked.
pub fn is_available_on(equipment: &Equipment, bookings: &[EquipmentBooking], date: NaiveDate) -> bool {
    !equipment.status.is_unavailable()
        && !bookings
            .iter()
            .any(|b| b.equipment_id == equipment.id && b.covers(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn unit(id: u64, due: Option<NaiveDate>) -> Equipment {
        Equipment {
            id,
            name: format!("Excavator {id}"),
            equipment_type: "excavator".into(),
            status: EquipmentStatus::InUse,
            project_id: None,
            operators: vec![],
            maintenance_due: due,
            maintenance_interval_days: Some(90),
        }
    }

    #[test]
    fn out_of_service_cannot_go_straight_to_in_use() {
        assert!(check_status_transition(EquipmentStatus::OutOfService, EquipmentStatus::InUse).is_err());
        assert!(check_status_transition(EquipmentStatus::OutOfService, EquipmentStatus::Available).is_ok());
        assert!(check_status_transition(EquipmentStatus::Maintenance, EquipmentStatus::InUse).is_ok());
    }

    #[test]
    fn due_list_respects_horizon_and_order() {
        let today = d(2024, 3, 13);
        let mut parked = unit(4, Some(d(2024, 3, 1)));
        parked.status = EquipmentStatus::OutOfService;
        let fleet = vec![
            unit(1, Some(d(2024, 3, 20))),
            unit(2, Some(d(2024, 3, 10))),
            unit(3, Some(d(2024, 4, 30))),
            parked,
            unit(5, None),
        ];
        let due = maintenance_due(&fleet, today, 14);
        let ids: Vec<u64> = due.iter().map(|d| d.equipment_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(due[0].is_overdue());
        assert_eq!(due[0].days_overdue, 3);
        assert!(!due[1].is_overdue());
    }

    #[test]
    fn completing_rolls_due_date_forward() {
        let mut e = unit(1, Some(d(2024, 3, 10)));
        e.status = EquipmentStatus::Maintenance;
        let mut rec = MaintenanceRecord {
            id: 7,
            equipment_id: 1,
            scheduled_date: d(2024, 3, 10),
            description: "Hydraulic service".into(),
            completed_on: None,
        };
        complete_maintenance(&mut e, &mut rec, d(2024, 3, 12)).unwrap();
        assert_eq!(e.status, EquipmentStatus::Available);
        assert_eq!(e.maintenance_due, Some(d(2024, 6, 10)));
        assert_eq!(rec.completed_on, Some(d(2024, 3, 12)));
        assert!(complete_maintenance(&mut e, &mut rec, d(2024, 3, 13)).is_err());
    }

    #[test]
    fn availability_checks_status_and_bookings() {
        let mut e = unit(1, None);
        e.status = EquipmentStatus::Available;
        let bookings = vec![EquipmentBooking { id: 1, equipment_id: 1, project_id: 1, start_date: d(2024, 3, 11), end_date: d(2024, 3, 15) }];
        assert!(!is_available_on(&e, &bookings, d(2024, 3, 12)));
        assert!(is_available_on(&e, &bookings, d(2024, 3, 16)));
        e.status = EquipmentStatus::Maintenance;
        assert!(!is_available_on(&e, &bookings, d(2024, 3, 16)));
    }
}
