//! Enumerations and field types shared across the planner.
//!
//! Every enum serialises in kebab-case so the workspace file and the CLI
//! accept the same spelling (`in-progress`, `site-visit`, ...).

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Blocked => "Blocked",
        }
    }
}

/// Task priority. Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

/// How a successor's schedule is bound to its predecessor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl DependencyType {
    pub fn label(self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FS",
            DependencyType::StartToStart => "SS",
            DependencyType::FinishToFinish => "FF",
            DependencyType::StartToFinish => "SF",
        }
    }

    /// Whether the arrow leaves the predecessor from its end edge.
    pub fn from_predecessor_end(self) -> bool {
        matches!(self, DependencyType::FinishToStart | DependencyType::FinishToFinish)
    }

    /// Whether the arrow enters the successor at its start edge.
    pub fn into_successor_start(self) -> bool {
        matches!(self, DependencyType::FinishToStart | DependencyType::StartToStart)
    }
}

/// Granularity of the Gantt timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    Days,
    Weeks,
    Months,
}

impl ViewMode {
    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Days => "Days",
            ViewMode::Weeks => "Weeks",
            ViewMode::Months => "Months",
        }
    }

    /// Cycle days -> weeks -> months -> days.
    pub fn next(self) -> Self {
        match self {
            ViewMode::Days => ViewMode::Weeks,
            ViewMode::Weeks => ViewMode::Months,
            ViewMode::Months => ViewMode::Days,
        }
    }
}

/// Equipment availability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EquipmentStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
    OutOfService,
}

impl EquipmentStatus {
    pub fn label(self) -> &'static str {
        match self {
            EquipmentStatus::Available => "Available",
            EquipmentStatus::InUse => "In Use",
            EquipmentStatus::Maintenance => "Maintenance",
            EquipmentStatus::OutOfService => "Out of Service",
        }
    }

    /// Equipment that cannot be put to work right now.
    pub fn is_unavailable(self) -> bool {
        matches!(self, EquipmentStatus::Maintenance | EquipmentStatus::OutOfService)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StakeholderType {
    #[default]
    Subcontractor,
    Employee,
    Vendor,
    Client,
}

impl StakeholderType {
    pub fn label(self) -> &'static str {
        match self {
            StakeholderType::Subcontractor => "Subcontractor",
            StakeholderType::Employee => "Employee",
            StakeholderType::Vendor => "Vendor",
            StakeholderType::Client => "Client",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StakeholderStatus {
    #[default]
    Active,
    Inactive,
    Pending,
    Suspended,
}

impl StakeholderStatus {
    pub fn label(self) -> &'static str {
        match self {
            StakeholderStatus::Active => "Active",
            StakeholderStatus::Inactive => "Inactive",
            StakeholderStatus::Pending => "Pending",
            StakeholderStatus::Suspended => "Suspended",
        }
    }
}

/// Lead pipeline stage, in pipeline order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 7] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Proposal,
        LeadStatus::Negotiation,
        LeadStatus::Won,
        LeadStatus::Lost,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::Proposal => "Proposal",
            LeadStatus::Negotiation => "Negotiation",
            LeadStatus::Won => "Won",
            LeadStatus::Lost => "Lost",
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, LeadStatus::Won | LeadStatus::Lost)
    }

    /// Column index on the pipeline board.
    pub fn index(self) -> usize {
        LeadStatus::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn label(self) -> &'static str {
        match self {
            AssignmentStatus::Active => "Active",
            AssignmentStatus::Completed => "Completed",
            AssignmentStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionType {
    Call,
    Email,
    Meeting,
    SiteVisit,
    Proposal,
    FollowUp,
}

impl InteractionType {
    pub fn label(self) -> &'static str {
        match self {
            InteractionType::Call => "Call",
            InteractionType::Email => "Email",
            InteractionType::Meeting => "Meeting",
            InteractionType::SiteVisit => "Site Visit",
            InteractionType::Proposal => "Proposal",
            InteractionType::FollowUp => "Follow-up",
        }
    }
}

/// Persisted choice of stakeholder layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StakeholderView {
    #[default]
    Table,
    Cards,
    Pipeline,
}

/// Sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Start,
    Due,
    Priority,
    Id,
}

/// Sorting options for the stakeholder directory.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StakeholderSort {
    Name,
    Rating,
    LeadScore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_serialise_kebab_case() {
        assert_eq!(serde_json::to_string(&TaskStatus::NotStarted).unwrap(), "\"not-started\"");
        assert_eq!(serde_json::to_string(&InteractionType::SiteVisit).unwrap(), "\"site-visit\"");
        assert_eq!(serde_json::to_string(&EquipmentStatus::OutOfService).unwrap(), "\"out-of-service\"");
        let t: DependencyType = serde_json::from_str("\"start-to-finish\"").unwrap();
        assert_eq!(t, DependencyType::StartToFinish);
    }

    #[test]
    fn priority_orders_by_urgency() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::Low < Priority::Medium);
    }

    #[test]
    fn lead_index_follows_pipeline_order() {
        assert_eq!(LeadStatus::New.index(), 0);
        assert_eq!(LeadStatus::Lost.index(), 6);
        assert!(LeadStatus::Won.is_closed());
        assert!(!LeadStatus::Proposal.is_closed());
    }

    #[test]
    fn dependency_anchor_edges() {
        assert!(DependencyType::FinishToStart.from_predecessor_end());
        assert!(DependencyType::FinishToStart.into_successor_start());
        assert!(!DependencyType::StartToFinish.from_predecessor_end());
        assert!(!DependencyType::StartToFinish.into_successor_start());
    }
}
