//! Filtering and ordering of the stakeholder directory.

use std::cmp::Ordering;

use crate::fields::{StakeholderSort, StakeholderStatus, StakeholderType};
use crate::stakeholder::Stakeholder;

/// Directory filter. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct StakeholderFilter {
    pub stakeholder_type: Option<StakeholderType>,
    pub status: Option<StakeholderStatus>,
    pub specialty: Option<String>,
    /// Case-insensitive match on company, contact and specialties.
    pub text: Option<String>,
}

impl StakeholderFilter {
    pub fn matches(&self, s: &Stakeholder) -> bool {
        if self.stakeholder_type.is_some_and(|t| t != s.stakeholder_type) {
            return false;
        }
        if self.status.is_some_and(|st| st != s.status) {
            return false;
        }
        if let Some(wanted) = &self.specialty {
            if !s.specialties.iter().any(|x| x.eq_ignore_ascii_case(wanted)) {
                return false;
            }
        }
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let hit = s.company_name.to_lowercase().contains(&needle)
                || s
                    .contact_person
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
                || s.specialties.iter().any(|x| x.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

pub fn filter_stakeholders<'a>(all: &'a [Stakeholder], filter: &StakeholderFilter) -> Vec<&'a Stakeholder> {
    all.iter().filter(|s| filter.matches(s)).collect()
}

/// Sort in place. Name ascending; rating and lead score descending with
/// unrated entries last. Ties fall back to name.
pub fn sort_stakeholders(list: &mut [&Stakeholder], key: StakeholderSort) {
    let by_name = |a: &Stakeholder, b: &Stakeholder| a.company_name.to_lowercase().cmp(&b.company_name.to_lowercase());
    list.sort_by(|a, b| {
        let primary = match key {
            StakeholderSort::Name => Ordering::Equal,
            StakeholderSort::Rating => desc_some_first(a.rating, b.rating),
            StakeholderSort::LeadScore => desc_some_first(a.lead_score.map(f64::from), b.lead_score.map(f64::from)),
        };
        primary.then_with(|| by_name(*a, *b))
    });
}

fn desc_some_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> Vec<Stakeholder> {
        let mut a = Stakeholder::new(1, "Acme Concrete", StakeholderType::Subcontractor);
        a.specialties = vec!["concrete".into(), "formwork".into()];
        a.rating = Some(4.2);
        a.lead_score = Some(40);
        let mut b = Stakeholder::new(2, "bolt electrical", StakeholderType::Subcontractor);
        b.specialties = vec!["electrical".into()];
        b.contact_person = Some("Dana Reyes".into());
        b.rating = Some(4.8);
        let mut c = Stakeholder::new(3, "City Council", StakeholderType::Client);
        c.status = StakeholderStatus::Pending;
        c.lead_score = Some(90);
        vec![a, b, c]
    }

    #[test]
    fn filters_combine() {
        let all = directory();
        let subs = StakeholderFilter { stakeholder_type: Some(StakeholderType::Subcontractor), ..Default::default() };
        assert_eq!(filter_stakeholders(&all, &subs).len(), 2);

        let text = StakeholderFilter { text: Some("reyes".into()), ..Default::default() };
        assert_eq!(filter_stakeholders(&all, &text)[0].id, 2);

        let specialty = StakeholderFilter { specialty: Some("Formwork".into()), ..Default::default() };
        assert_eq!(filter_stakeholders(&all, &specialty)[0].id, 1);

        let pending_subs = StakeholderFilter {
            stakeholder_type: Some(StakeholderType::Subcontractor),
            status: Some(StakeholderStatus::Pending),
            ..Default::default()
        };
        assert!(filter_stakeholders(&all, &pending_subs).is_empty());
    }

    #[test]
    fn sorting_puts_missing_values_last() {
        let all = directory();
        let mut list: Vec<&Stakeholder> = all.iter().collect();

        sort_stakeholders(&mut list, StakeholderSort::Name);
        assert_eq!(list.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        sort_stakeholders(&mut list, StakeholderSort::Rating);
        assert_eq!(list.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 1, 3]);

        sort_stakeholders(&mut list, StakeholderSort::LeadScore);
        assert_eq!(list.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3, 1, 2]);
    }
}
