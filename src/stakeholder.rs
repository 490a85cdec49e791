//! Stakeholder directory records: companies, their project assignments,
//! contact history and performance ratings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stakeholder {
    pub id: u64,
    pub company_name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub stakeholder_type: StakeholderType,
    #[serde(default)]
    pub status: StakeholderStatus,
    /// Mean overall performance score, 0-5.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub lead_status: Option<LeadStatus>,
    #[serde(default)]
    pub lead_score: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Stakeholder {
    pub fn new(id: u64, company_name: impl Into<String>, stakeholder_type: StakeholderType) -> Self {
        Stakeholder {
            id,
            company_name: company_name.into(),
            contact_person: None,
            email: None,
            phone: None,
            stakeholder_type,
            status: StakeholderStatus::Active,
            rating: None,
            specialties: Vec::new(),
            lead_status: None,
            lead_score: None,
            notes: None,
        }
    }
}

/// A stakeholder engaged on a project, optionally on one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StakeholderAssignment {
    pub id: u64,
    pub stakeholder_id: u64,
    pub project_id: u64,
    #[serde(default)]
    pub task_id: Option<u64>,
    pub role: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: AssignmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactInteraction {
    pub id: u64,
    pub stakeholder_id: u64,
    pub interaction_type: InteractionType,
    pub date: NaiveDate,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub follow_up_done: bool,
}

/// Scores are 1-5.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceRating {
    pub id: u64,
    pub stakeholder_id: u64,
    #[serde(default)]
    pub project_id: Option<u64>,
    pub quality: u8,
    pub timeliness: u8,
    pub communication: u8,
    pub safety: u8,
    #[serde(default)]
    pub comments: Option<String>,
    pub rated_on: NaiveDate,
}
