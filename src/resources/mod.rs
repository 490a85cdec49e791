//! Crew utilization, equipment upkeep and cross-project conflict checks.

pub mod allocation;
pub mod conflict;
pub mod maintenance;
