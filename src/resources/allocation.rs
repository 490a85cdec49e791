//! Weekly utilization of team members across projects.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::crew::{ResourceAllocation, TeamMember, DEFAULT_WEEKLY_CAPACITY};
use crate::gantt::timeline::week_start;

/// Over-allocation beyond this share of capacity is treated as critical.
pub const CRITICAL_UTILIZATION: f64 = 1.25;

/// One member's booked hours for one Sunday-aligned week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyLoad {
    pub member_id: u64,
    pub week_start: NaiveDate,
    pub hours: f64,
    pub capacity: f64,
    /// `(project_id, hours)` in project order.
    pub by_project: Vec<(u64, f64)>,
}

impl WeeklyLoad {
    pub fn percent(&self) -> f64 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        self.hours / self.capacity * 100.0
    }

    pub fn is_over_allocated(&self) -> bool {
        self.hours > self.capacity
    }

    pub fn is_critical(&self) -> bool {
        self.hours > self.capacity * CRITICAL_UTILIZATION
    }

    pub fn spare(&self) -> f64 {
        (self.capacity - self.hours).max(0.0)
    }
}

fn capacity_of(members: &[TeamMember], member_id: u64) -> f64 {
    members
        .iter()
        .find(|m| m.id == member_id)
        .map(|m| m.weekly_capacity_hours)
        .unwrap_or(DEFAULT_WEEKLY_CAPACITY)
}

/// Sum allocations per member and week, ordered by member then week.
///
/// Allocation dates are snapped to their week start, so stray mid-week
/// dates still land in the right bucket.
pub fn weekly_utilization(members: &[TeamMember], allocations: &[ResourceAllocation]) -> Vec<WeeklyLoad> {
    let mut buckets: BTreeMap<(u64, NaiveDate), BTreeMap<u64, f64>> = BTreeMap::new();
    for a in allocations {
        *buckets
            .entry((a.team_member_id, week_start(a.week_start)))
            .or_default()
            .entry(a.project_id)
            .or_default() += a.hours;
    }
    buckets
        .into_iter()
        .map(|((member_id, week), projects)| WeeklyLoad {
            member_id,
            week_start: week,
            hours: projects.values().sum(),
            capacity: capacity_of(members, member_id),
            by_project: projects.into_iter().collect(),
        })
        .collect()
}

/// Hours a member still has free in the week containing `date`.
pub fn spare_capacity(member: &TeamMember, allocations: &[ResourceAllocation], date: NaiveDate) -> f64 {
    let week = week_start(date);
    let booked: f64 = allocations
        .iter()
        .filter(|a| a.team_member_id == member.id && week_start(a.week_start) == week)
        .map(|a| a.hours)
        .sum();
    (member.weekly_capacity_hours - booked).max(0.0)
}
