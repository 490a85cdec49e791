//! Performance ratings and the derived stakeholder rating.

use crate::stakeholder::PerformanceRating;

pub fn overall_score(rating: &PerformanceRating) -> f64 {
    let total = u32::from(rating.quality)
        + u32::from(rating.timeliness)
        + u32::from(rating.communication)
        + u32::from(rating.safety);
    f64::from(total) / 4.0
}

/// Mean overall score across a stakeholder's ratings, one decimal.
pub fn stakeholder_rating(ratings: &[PerformanceRating], stakeholder_id: u64) -> Option<f64> {
    let scores: Vec<f64> = ratings
        .iter()
        .filter(|r| r.stakeholder_id == stakeholder_id)
        .map(overall_score)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}
