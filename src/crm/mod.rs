//! Stakeholder relationship management: directory, lead pipeline, contact
//! history and performance ratings.

pub mod directory;
pub mod interaction;
pub mod performance;
pub mod pipeline;
