//! Stakeholder directory, lead pipeline, assignments, contact log and
//! performance ratings.

use chrono::NaiveDate;
use tracing::info;

use crate::crm::interaction::mark_follow_up_done;
use crate::crm::performance::stakeholder_rating;
use crate::crm::pipeline::{check_stage_change, next_stage, Direction};
use crate::db::{split_and_normalise_labels, Repository};
use crate::error::{AppError, AppResult};
use crate::fields::{AssignmentStatus, InteractionType, LeadStatus, StakeholderStatus, StakeholderType};
use crate::stakeholder::{ContactInteraction, PerformanceRating, Stakeholder, StakeholderAssignment};
use crate::validate::Checks;

use super::Workspace;

#[derive(Debug, Clone, Default)]
pub struct StakeholderDraft {
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub stakeholder_type: StakeholderType,
    pub status: StakeholderStatus,
    pub specialties: Vec<String>,
    pub lead_status: Option<LeadStatus>,
    pub lead_score: Option<u8>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StakeholderPatch {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub stakeholder_type: Option<StakeholderType>,
    pub status: Option<StakeholderStatus>,
    pub specialties: Option<Vec<String>>,
    pub lead_score: Option<u8>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssignmentDraft {
    pub stakeholder_id: u64,
    pub project_id: u64,
    pub task_id: Option<u64>,
    pub role: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct InteractionDraft {
    pub stakeholder_id: u64,
    pub interaction_type: InteractionType,
    pub date: NaiveDate,
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct RatingDraft {
    pub stakeholder_id: u64,
    pub project_id: Option<u64>,
    pub quality: u8,
    pub timeliness: u8,
    pub communication: u8,
    pub safety: u8,
    pub comments: Option<String>,
    pub rated_on: NaiveDate,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_stakeholder(s: &Stakeholder) -> AppResult<()> {
    Checks::new()
        .non_empty("company name", &s.company_name)
        .email(s.email.as_deref())
        .range("lead score", s.lead_score.map(f64::from), 0.0, 100.0)
        .finish()
}

impl<R: Repository> Workspace<R> {
    pub fn add_stakeholder(&mut self, draft: StakeholderDraft) -> AppResult<u64> {
        let id = self.mutate("add stakeholder", |db| {
            let mut s = Stakeholder::new(db.next_stakeholder_id(), draft.company_name.trim(), draft.stakeholder_type);
            s.contact_person = non_blank(draft.contact_person);
            s.email = non_blank(draft.email);
            s.phone = non_blank(draft.phone);
            s.status = draft.status;
            s.specialties = split_and_normalise_labels(&draft.specialties);
            s.lead_status = draft.lead_status;
            s.lead_score = draft.lead_score;
            s.notes = non_blank(draft.notes);
            check_stakeholder(&s)?;
            let id = s.id;
            db.stakeholders.push(s);
            Ok(id)
        })?;
        info!(stakeholder_id = id, "stakeholder added");
        Ok(id)
    }

    pub fn update_stakeholder(&mut self, id: u64, patch: StakeholderPatch) -> AppResult<()> {
        self.mutate("update stakeholder", |db| {
            let mut s = db.require_stakeholder(id)?.clone();
            if let Some(name) = patch.company_name {
                s.company_name = name.trim().to_string();
            }
            if patch.contact_person.is_some() {
                s.contact_person = non_blank(patch.contact_person);
            }
            if patch.email.is_some() {
                s.email = non_blank(patch.email);
            }
            if patch.phone.is_some() {
                s.phone = non_blank(patch.phone);
            }
            if let Some(kind) = patch.stakeholder_type {
                s.stakeholder_type = kind;
            }
            if let Some(status) = patch.status {
                s.status = status;
            }
            if let Some(specialties) = patch.specialties {
                s.specialties = split_and_normalise_labels(&specialties);
            }
            if let Some(score) = patch.lead_score {
                s.lead_score = Some(score);
            }
            if patch.notes.is_some() {
                s.notes = non_blank(patch.notes);
            }
            check_stakeholder(&s)?;
            if let Some(slot) = db.stakeholder_mut(id) {
                *slot = s;
            }
            Ok(())
        })?;
        info!(stakeholder_id = id, "stakeholder updated");
        Ok(())
    }

    /// Put a stakeholder on a pipeline stage directly.
    pub fn set_lead_stage(&mut self, id: u64, stage: LeadStatus) -> AppResult<()> {
        self.mutate("set lead stage", |db| {
            let s = db
                .stakeholder_mut(id)
                .ok_or(AppError::NotFound { entity: "stakeholder", id })?;
            check_stage_change(s.lead_status, stage)?;
            s.lead_status = Some(stage);
            Ok(())
        })?;
        info!(stakeholder_id = id, stage = stage.label(), "lead stage set");
        Ok(())
    }

    /// Step a lead one stage. Stakeholders not yet in the pipeline enter it
    /// as new when moved forward.
    pub fn move_lead(&mut self, id: u64, direction: Direction) -> AppResult<LeadStatus> {
        let stage = self.mutate("move lead", |db| {
            let s = db
                .stakeholder_mut(id)
                .ok_or(AppError::NotFound { entity: "stakeholder", id })?;
            let to = match (s.lead_status, direction) {
                (None, Direction::Forward) => LeadStatus::New,
                (None, Direction::Back) => {
                    return Err(AppError::invalid(format!("stakeholder {id} is not in the pipeline")));
                }
                (Some(current), _) => next_stage(current, direction)?,
            };
            s.lead_status = Some(to);
            Ok(to)
        })?;
        info!(stakeholder_id = id, stage = stage.label(), "lead moved");
        Ok(stage)
    }

    pub fn assign_stakeholder(&mut self, draft: AssignmentDraft) -> AppResult<u64> {
        Checks::new()
            .non_empty("role", &draft.role)
            .date_order("start date", Some(draft.start_date), "end date", draft.end_date)
            .finish()?;
        let id = self.mutate("assign stakeholder", |db| {
            db.require_stakeholder(draft.stakeholder_id)?;
            db.require_project(draft.project_id)?;
            if let Some(task_id) = draft.task_id {
                let task = db.require_task(task_id)?;
                if task.project_id.is_some_and(|p| p != draft.project_id) {
                    return Err(AppError::invalid(format!(
                        "task {task_id} belongs to a different project"
                    )));
                }
            }
            let id = db.next_assignment_id();
            db.assignments.push(StakeholderAssignment {
                id,
                stakeholder_id: draft.stakeholder_id,
                project_id: draft.project_id,
                task_id: draft.task_id,
                role: draft.role.trim().to_string(),
                start_date: draft.start_date,
                end_date: draft.end_date,
                status: AssignmentStatus::Active,
            });
            Ok(id)
        })?;
        info!(assignment_id = id, "stakeholder assigned");
        Ok(id)
    }

    /// Close an active assignment as completed or cancelled. Completing
    /// without an end date stamps today.
    pub fn close_assignment(&mut self, id: u64, status: AssignmentStatus) -> AppResult<()> {
        let today = self.today;
        self.mutate("close assignment", |db| {
            let a = db
                .assignments
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(AppError::NotFound { entity: "assignment", id })?;
            if a.status != AssignmentStatus::Active || status == AssignmentStatus::Active {
                return Err(AppError::InvalidTransition {
                    entity: "assignment",
                    from: a.status.label().to_string(),
                    to: status.label().to_string(),
                });
            }
            a.status = status;
            if status == AssignmentStatus::Completed && a.end_date.is_none() {
                a.end_date = Some(today.max(a.start_date));
            }
            Ok(())
        })?;
        info!(assignment_id = id, status = status.label(), "assignment closed");
        Ok(())
    }

    pub fn complete_assignment(&mut self, id: u64) -> AppResult<()> {
        self.close_assignment(id, AssignmentStatus::Completed)
    }

    pub fn assignments_for(&self, stakeholder_id: Option<u64>, project_id: Option<u64>) -> Vec<&StakeholderAssignment> {
        self.db
            .assignments
            .iter()
            .filter(|a| stakeholder_id.map_or(true, |id| id == a.stakeholder_id))
            .filter(|a| project_id.map_or(true, |id| id == a.project_id))
            .collect()
    }

    pub fn log_interaction(&mut self, draft: InteractionDraft) -> AppResult<u64> {
        Checks::new()
            .date_order("interaction date", Some(draft.date), "follow-up date", draft.follow_up_date)
            .finish()?;
        let id = self.mutate("log interaction", |db| {
            db.require_stakeholder(draft.stakeholder_id)?;
            let id = db.next_interaction_id();
            db.interactions.push(ContactInteraction {
                id,
                stakeholder_id: draft.stakeholder_id,
                interaction_type: draft.interaction_type,
                date: draft.date,
                duration_minutes: draft.duration_minutes,
                notes: non_blank(draft.notes),
                follow_up_date: draft.follow_up_date,
                follow_up_done: false,
            });
            Ok(id)
        })?;
        info!(interaction_id = id, kind = draft.interaction_type.label(), "interaction logged");
        Ok(id)
    }

    pub fn complete_follow_up(&mut self, interaction_id: u64) -> AppResult<()> {
        self.mutate("complete follow-up", |db| {
            let interaction = db
                .interactions
                .iter_mut()
                .find(|i| i.id == interaction_id)
                .ok_or(AppError::NotFound { entity: "interaction", id: interaction_id })?;
            mark_follow_up_done(interaction)
        })?;
        info!(interaction_id, "follow-up done");
        Ok(())
    }

    /// Record a rating and refresh the stakeholder's average.
    pub fn rate_stakeholder(&mut self, draft: RatingDraft) -> AppResult<f64> {
        Checks::new()
            .score("quality", draft.quality)
            .score("timeliness", draft.timeliness)
            .score("communication", draft.communication)
            .score("safety", draft.safety)
            .finish()?;
        let rating = self.mutate("rate stakeholder", |db| {
            db.require_stakeholder(draft.stakeholder_id)?;
            if let Some(project) = draft.project_id {
                db.require_project(project)?;
            }
            let id = db.next_rating_id();
            db.ratings.push(PerformanceRating {
                id,
                stakeholder_id: draft.stakeholder_id,
                project_id: draft.project_id,
                quality: draft.quality,
                timeliness: draft.timeliness,
                communication: draft.communication,
                safety: draft.safety,
                comments: non_blank(draft.comments),
                rated_on: draft.rated_on,
            });
            let rating = stakeholder_rating(&db.ratings, draft.stakeholder_id);
            if let Some(s) = db.stakeholder_mut(draft.stakeholder_id) {
                s.rating = rating;
            }
            Ok(rating.unwrap_or_default())
        })?;
        info!(stakeholder_id = draft.stakeholder_id, rating, "stakeholder rated");
        Ok(rating)
    }
}
