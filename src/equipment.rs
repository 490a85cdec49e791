//! Equipment, its project bookings and maintenance history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::EquipmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Equipment {
    pub id: u64,
    pub name: String,
    pub equipment_type: String,
    #[serde(default)]
    pub status: EquipmentStatus,
    #[serde(default)]
    pub project_id: Option<u64>,
    /// Team member ids certified to operate this unit.
    #[serde(default)]
    pub operators: Vec<u64>,
    #[serde(default)]
    pub maintenance_due: Option<NaiveDate>,
    #[serde(default)]
    pub maintenance_interval_days: Option<i64>,
}

/// Equipment reserved for a project over an inclusive date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentBooking {
    pub id: u64,
    pub equipment_id: u64,
    pub project_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl EquipmentBooking {
    pub fn overlaps(&self, other: &EquipmentBooking) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceRecord {
    pub id: u64,
    pub equipment_id: u64,
    pub scheduled_date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub completed_on: Option<NaiveDate>,
}
