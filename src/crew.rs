//! Team members and their weekly project allocations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEEKLY_CAPACITY: f64 = 40.0;

fn default_capacity() -> f64 {
    DEFAULT_WEEKLY_CAPACITY
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_capacity")]
    pub weekly_capacity_hours: f64,
}

impl TeamMember {
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s.eq_ignore_ascii_case(skill))
    }
}

/// Hours a member is booked on a project for one Sunday-aligned week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceAllocation {
    pub id: u64,
    pub project_id: u64,
    pub team_member_id: u64,
    pub week_start: NaiveDate,
    pub hours: f64,
}
