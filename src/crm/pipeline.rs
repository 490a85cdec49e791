//! Lead pipeline: stage moves and the board summary.

use clap::ValueEnum;

use crate::error::{AppError, AppResult};
use crate::fields::LeadStatus;
use crate::stakeholder::Stakeholder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Forward,
    Back,
}

/// Stage one step from `current`.
///
/// Forward from negotiation lands on won; won and lost never move forward.
/// Back from lost reopens the lead as new, and back from won returns it to
/// negotiation.
pub fn next_stage(current: LeadStatus, direction: Direction) -> AppResult<LeadStatus> {
    let to = match (current, direction) {
        (LeadStatus::Won | LeadStatus::Lost, Direction::Forward) => None,
        (LeadStatus::New, Direction::Back) => None,
        (LeadStatus::Lost, Direction::Back) => Some(LeadStatus::New),
        (s, Direction::Forward) => LeadStatus::ALL.get(s.index() + 1).copied(),
        (s, Direction::Back) => LeadStatus::ALL.get(s.index() - 1).copied(),
    };
    to.ok_or_else(|| AppError::InvalidTransition {
        entity: "lead",
        from: current.label().to_string(),
        to: match direction {
            Direction::Forward => "the next stage".to_string(),
            Direction::Back => "the previous stage".to_string(),
        },
    })
}

/// Set a lead's stage directly. Any stage may be chosen except moving a
/// closed lead to another closed stage.
pub fn check_stage_change(current: Option<LeadStatus>, to: LeadStatus) -> AppResult<()> {
    match current {
        Some(from) if from.is_closed() && to.is_closed() && from != to => Err(AppError::InvalidTransition {
            entity: "lead",
            from: from.label().to_string(),
            to: to.label().to_string(),
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub stage: LeadStatus,
    pub count: usize,
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    pub stages: Vec<StageSummary>,
    /// won / (won + lost); `None` until something has closed.
    pub conversion_rate: Option<f64>,
}

/// Per-stage counts over stakeholders that are in the pipeline.
pub fn pipeline_summary(stakeholders: &[Stakeholder]) -> PipelineSummary {
    let stages: Vec<StageSummary> = LeadStatus::ALL
        .iter()
        .map(|&stage| {
            let in_stage: Vec<&Stakeholder> = stakeholders.iter().filter(|s| s.lead_status == Some(stage)).collect();
            let scores: Vec<f64> = in_stage.iter().filter_map(|s| s.lead_score).map(f64::from).collect();
            StageSummary {
                stage,
                count: in_stage.len(),
                average_score: (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64),
            }
        })
        .collect();
    let won = stages[LeadStatus::Won.index()].count;
    let lost = stages[LeadStatus::Lost.index()].count;
    PipelineSummary {
        stages,
        conversion_rate: (won + lost > 0).then(|| won as f64 / (won + lost) as f64),
    }
}

/// Stakeholders on one board column, highest score first.
pub fn leads_in_stage(stakeholders: &[Stakeholder], stage: LeadStatus) -> Vec<&Stakeholder> {
    let mut leads: Vec<&Stakeholder> = stakeholders.iter().filter(|s| s.lead_status == Some(stage)).collect();
    leads.sort_by(|a, b| b.lead_score.cmp(&a.lead_score).then(a.id.cmp(&b.id)));
    leads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::StakeholderType;

    fn lead(id: u64, stage: LeadStatus, score: Option<u8>) -> Stakeholder {
        let mut s = Stakeholder::new(id, format!("Lead {id}"), StakeholderType::Client);
        s.lead_status = Some(stage);
        s.lead_score = score;
        s
    }

    #[test]
    fn moves_one_stage_at_a_time() {
        assert_eq!(next_stage(LeadStatus::New, Direction::Forward).unwrap(), LeadStatus::Contacted);
        assert_eq!(next_stage(LeadStatus::Negotiation, Direction::Forward).unwrap(), LeadStatus::Won);
        assert_eq!(next_stage(LeadStatus::Qualified, Direction::Back).unwrap(), LeadStatus::Contacted);
        assert_eq!(next_stage(LeadStatus::Won, Direction::Back).unwrap(), LeadStatus::Negotiation);
    }

    #[test]
    fn closed_leads_are_terminal_going_forward() {
        assert!(next_stage(LeadStatus::Won, Direction::Forward).is_err());
        assert!(next_stage(LeadStatus::Lost, Direction::Forward).is_err());
        assert!(next_stage(LeadStatus::New, Direction::Back).is_err());
        assert_eq!(next_stage(LeadStatus::Lost, Direction::Back).unwrap(), LeadStatus::New);
    }

    #[test]
    fn direct_changes_between_closed_stages_are_refused() {
        assert!(check_stage_change(Some(LeadStatus::Won), LeadStatus::Lost).is_err());
        assert!(check_stage_change(Some(LeadStatus::Lost), LeadStatus::Qualified).is_ok());
        assert!(check_stage_change(None, LeadStatus::Won).is_ok());
    }

    #[test]
    fn summary_counts_scores_and_conversion() {
        let leads = vec![
            lead(1, LeadStatus::New, Some(20)),
            lead(2, LeadStatus::New, Some(40)),
            lead(3, LeadStatus::New, None),
            lead(4, LeadStatus::Won, Some(90)),
            lead(5, LeadStatus::Lost, Some(10)),
            lead(6, LeadStatus::Won, None),
            Stakeholder::new(7, "Not a lead", StakeholderType::Vendor),
        ];
        let summary = pipeline_summary(&leads);
        assert_eq!(summary.stages.len(), 7);
        assert_eq!(summary.stages[0].count, 3);
        assert_eq!(summary.stages[0].average_score, Some(30.0));
        assert_eq!(summary.stages[1].average_score, None);
        let rate = summary.conversion_rate.unwrap();
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);

        assert_eq!(pipeline_summary(&[]).conversion_rate, None);
    }

    #[test]
    fn stage_column_orders_by_score() {
        let leads = vec![lead(1, LeadStatus::Proposal, Some(20)), lead(2, LeadStatus::Proposal, Some(70)), lead(3, LeadStatus::Proposal, None)];
        let ids: Vec<u64> = leads_in_stage(&leads, LeadStatus::Proposal).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
