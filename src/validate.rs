//! Field checks run before any record is written.
//!
//! Every check runs so the user sees all problems at once; the collected
//! messages become a single `AppError::Validation`.

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<String>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, ok: bool, msg: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(msg.into());
        }
        self
    }

    pub fn non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        self.require(!value.trim().is_empty(), format!("{field} is required"))
    }

    pub fn date_order(&mut self, start_field: &str, start: Option<NaiveDate>, end_field: &str, end: Option<NaiveDate>) -> &mut Self {
        if let (Some(s), Some(e)) = (start, end) {
            self.require(e >= s, format!("{end_field} must not be before {start_field}"));
        }
        self
    }

    pub fn range(&mut self, field: &str, value: Option<f64>, min: f64, max: f64) -> &mut Self {
        if let Some(v) = value {
            self.require(
                v.is_finite() && v >= min && v <= max,
                format!("{field} must be between {min} and {max}"),
            );
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: Option<f64>) -> &mut Self {
        if let Some(v) = value {
            self.require(v.is_finite() && v > 0.0, format!("{field} must be greater than zero"));
        }
        self
    }

    pub fn email(&mut self, value: Option<&str>) -> &mut Self {
        if let Some(email) = value.map(str::trim).filter(|e| !e.is_empty()) {
            let ok = email
                .split_once('@')
                .is_some_and(|(user, host)| !user.is_empty() && host.contains('.') && !host.starts_with('.'));
            self.require(ok, format!("'{email}' is not a valid email address"));
        }
        self
    }

    pub fn score(&mut self, field: &str, value: u8) -> &mut Self {
        self.require((1..=5).contains(&value), format!("{field} score must be 1-5"))
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(&mut self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn collects_every_failure() {
        let err = Checks::new()
            .non_empty("title", "  ")
            .date_order("start date", Some(d(2024, 3, 10)), "due date", Some(d(2024, 3, 9)))
            .range("progress", Some(120.0), 0.0, 100.0)
            .finish()
            .unwrap_err();
        match err {
            AppError::Validation(msgs) => {
                assert_eq!(msgs.len(), 3);
                assert_eq!(msgs[0], "title is required");
                assert_eq!(msgs[1], "due date must not be before start date");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_optional_values_pass() {
        assert!(Checks::new()
            .date_order("start", None, "end", Some(d(2024, 3, 1)))
            .range("lead score", None, 0.0, 100.0)
            .positive("hours", None)
            .email(None)
            .finish()
            .is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(Checks::new().email(Some("site@acme.co")).finish().is_ok());
        assert!(Checks::new().email(Some("")).finish().is_ok());
        assert!(Checks::new().email(Some("acme.co")).finish().is_err());
        assert!(Checks::new().email(Some("site@localhost")).finish().is_err());
    }

    #[test]
    fn scores_are_one_to_five() {
        assert!(Checks::new().score("quality", 5).finish().is_ok());
        assert!(Checks::new().score("quality", 0).finish().is_err());
        assert!(Checks::new().score("safety", 6).finish().is_err());
    }

    #[test]
    fn same_day_is_in_order() {
        assert!(Checks::new()
            .date_order("start", Some(d(2024, 3, 1)), "end", Some(d(2024, 3, 1)))
            .finish()
            .is_ok());
    }
}
