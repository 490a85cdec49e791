//! Contact history and follow-up tracking.

use chrono::{Duration, NaiveDate};

use crate::error::{AppError, AppResult};
use crate::stakeholder::ContactInteraction;

/// Interactions with one stakeholder, newest first.
pub fn timeline(interactions: &[ContactInteraction], stakeholder_id: u64) -> Vec<&ContactInteraction> {
    let mut out: Vec<&ContactInteraction> = interactions
        .iter()
        .filter(|i| i.stakeholder_id == stakeholder_id)
        .collect();
    out.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    out
}

/// Open follow-ups due on or before `today + horizon_days`, soonest first.
pub fn pending_follow_ups(interactions: &[ContactInteraction], today: NaiveDate, horizon_days: i64) -> Vec<&ContactInteraction> {
    let horizon = today + Duration::days(horizon_days.max(0));
    let mut out: Vec<&ContactInteraction> = interactions
        .iter()
        .filter(|i| !i.follow_up_done && i.follow_up_date.is_some_and(|d| d <= horizon))
        .collect();
    out.sort_by_key(|i| (i.follow_up_date, i.id));
    out
}

pub fn mark_follow_up_done(interaction: &mut ContactInteraction) -> AppResult<()> {
    if interaction.follow_up_date.is_none() {
        return Err(AppError::invalid(format!(
            "interaction {} has no follow-up scheduled",
            interaction.id
        )));
    }
    interaction.follow_up_done = true;
    Ok(())
}
