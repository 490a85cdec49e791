//! Displayed date range of a task and its placement on the grid.

use chrono::{NaiveDate, TimeDelta};

use crate::task::Task;

use super::timeline::{period_end, Timeline};

/// Working hours in one scheduled day.
pub const HOURS_PER_DAY: f64 = 8.0;

/// Largest estimate a task may carry; larger stored values are treated as
/// this when laying out the chart.
pub const MAX_ESTIMATED_HOURS: f64 = 100_000.0;

/// Where a task's displayed dates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// Both `start_date` and `due_date` were set.
    Explicit,
    /// `start_date` plus the estimate.
    FromStart,
    /// `due_date` minus the estimate.
    FromDue,
    /// Nothing usable: today to tomorrow.
    Default,
}

impl DateSource {
    pub fn label(self) -> &'static str {
        match self {
            DateSource::Explicit => "explicit",
            DateSource::FromStart => "start+estimate",
            DateSource::FromDue => "due-estimate",
            DateSource::Default => "default",
        }
    }
}

/// Inclusive date range a task occupies on the chart. `start <= end` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDates {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub source: DateSource,
}

impl TaskDates {
    /// Whole days between start and end.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Inclusive range intersection.
    pub fn overlaps(&self, other: &TaskDates) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Calendar days needed for `hours` of work, rounded up.
pub fn days_for_hours(hours: f64) -> i64 {
    if !hours.is_finite() || hours <= 0.0 {
        return 0;
    }
    (hours.min(MAX_ESTIMATED_HOURS) / HOURS_PER_DAY).ceil() as i64
}

/// `date` moved by `days`, pinned to the calendar limits on overflow.
pub fn offset_days(date: NaiveDate, days: i64) -> NaiveDate {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Derive the displayed date range from whatever the task carries.
///
/// Precedence: both dates verbatim; start plus estimate; due minus
/// estimate; otherwise today..tomorrow. An explicit due date before the
/// start collapses to a single day at the start.
pub fn task_dates_from_estimate(task: &Task, today: NaiveDate) -> TaskDates {
    match (task.start_date, task.due_date, task.estimated_hours) {
        (Some(start), Some(due), _) => TaskDates {
            start,
            end: due.max(start),
            source: DateSource::Explicit,
        },
        (Some(start), None, Some(hours)) => TaskDates {
            start,
            end: offset_days(start, days_for_hours(hours)),
            source: DateSource::FromStart,
        },
        (None, Some(due), Some(hours)) => TaskDates {
            start: offset_days(due, -days_for_hours(hours)),
            end: due,
            source: DateSource::FromDue,
        },
        _ => TaskDates {
            start: today,
            end: offset_days(today, 1),
            source: DateSource::Default,
        },
    }
}

/// Column placement of a task bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub start_column: usize,
    /// At least 1.
    pub span: usize,
    /// Set when part of the task lies outside the timeline.
    pub clamped: bool,
}

/// Place a task on the timeline, clamped to the valid column range.
pub fn task_grid_position(task: &Task, timeline: &Timeline, today: NaiveDate) -> GridPosition {
    position_for_dates(&task_dates_from_estimate(task, today), timeline)
}

/// Place an already-inferred date range on the timeline.
pub fn position_for_dates(dates: &TaskDates, timeline: &Timeline) -> GridPosition {
    let count = timeline.len();
    if count == 0 {
        return GridPosition {
            start_column: 0,
            span: 1,
            clamped: true,
        };
    }
    let start_column = timeline.column_of(dates.start).min(count - 1);
    let end_column = timeline.column_of(dates.end).min(count - 1);
    let span = (end_column.saturating_sub(start_column) + 1).clamp(1, count - start_column);

    let first = timeline.units[0].start;
    let last_end = period_end(timeline.units[count - 1].start, timeline.mode);
    let clamped = dates.start < first || dates.end >= last_end;

    GridPosition {
        start_column,
        span,
        clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ViewMode;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn task(start: Option<NaiveDate>, due: Option<NaiveDate>, hours: Option<f64>) -> Task {
        let mut t = Task::new(1, "Install windows", 0);
        t.start_date = start;
        t.due_date = due;
        t.estimated_hours = hours;
        t
    }

    fn today() -> NaiveDate {
        d(2024, 3, 13)
    }

    #[test]
    fn explicit_dates_win() {
        let dates = task_dates_from_estimate(&task(Some(d(2024, 3, 1)), Some(d(2024, 3, 5)), Some(100.0)), today());
        assert_eq!((dates.start, dates.end), (d(2024, 3, 1), d(2024, 3, 5)));
        assert_eq!(dates.source, DateSource::Explicit);
    }

    #[test]
    fn start_plus_estimate_rounds_up_to_whole_days() {
        let dates = task_dates_from_estimate(&task(Some(d(2024, 3, 1)), None, Some(17.0)), today());
        assert_eq!(dates.end, d(2024, 3, 4));
        assert_eq!(dates.source, DateSource::FromStart);
    }

    #[test]
    fn due_minus_estimate() {
        let dates = task_dates_from_estimate(&task(None, Some(d(2024, 3, 10)), Some(8.0)), today());
        assert_eq!(dates.start, d(2024, 3, 9));
        assert_eq!(dates.source, DateSource::FromDue);
    }

    #[test]
    fn missing_everything_defaults_to_today_tomorrow() {
        let dates = task_dates_from_estimate(&task(None, None, None), today());
        assert_eq!((dates.start, dates.end), (today(), d(2024, 3, 14)));
        assert_eq!(dates.source, DateSource::Default);
        // A lone start without an estimate also falls through to the default.
        let dates = task_dates_from_estimate(&task(Some(d(2024, 1, 1)), None, None), today());
        assert_eq!(dates.source, DateSource::Default);
    }

    #[test]
    fn start_never_after_end() {
        let dates_pool = [None, Some(d(2024, 3, 1)), Some(d(2024, 3, 9))];
        let hours_pool = [None, Some(-5.0), Some(0.0), Some(0.5), Some(40.0), Some(f64::NAN)];
        for s in dates_pool {
            for e in dates_pool {
                for h in hours_pool {
                    let dates = task_dates_from_estimate(&task(s, e, h), today());
                    assert!(dates.start <= dates.end, "{s:?} {e:?} {h:?}");
                }
            }
        }
    }

    #[test]
    fn oversized_estimates_are_capped() {
        let dates = task_dates_from_estimate(&task(Some(d(2024, 3, 11)), None, Some(1e12)), today());
        assert_eq!(dates.end, d(2024, 3, 11) + TimeDelta::days(12_500));
        let dates = task_dates_from_estimate(&task(None, Some(d(2024, 3, 11)), Some(f64::MAX)), today());
        assert_eq!(dates.start, d(2024, 3, 11) - TimeDelta::days(12_500));
    }

    #[test]
    fn inference_near_calendar_limits_does_not_overflow() {
        let dates = task_dates_from_estimate(&task(Some(NaiveDate::MAX), None, Some(40.0)), today());
        assert_eq!((dates.start, dates.end), (NaiveDate::MAX, NaiveDate::MAX));
        let dates = task_dates_from_estimate(&task(None, Some(NaiveDate::MIN), Some(40.0)), today());
        assert_eq!((dates.start, dates.end), (NaiveDate::MIN, NaiveDate::MIN));
        let dates = task_dates_from_estimate(&task(None, None, None), NaiveDate::MAX);
        assert!(dates.start <= dates.end);
    }

    #[test]
    fn inference_is_idempotent() {
        let t = task(None, Some(d(2024, 3, 10)), Some(20.0));
        assert_eq!(task_dates_from_estimate(&t, today()), task_dates_from_estimate(&t, today()));
    }

    #[test]
    fn grid_position_spans_and_clamps() {
        let tl = Timeline::new(d(2024, 3, 1), d(2024, 3, 10), ViewMode::Days);
        let pos = task_grid_position(&task(Some(d(2024, 3, 3)), Some(d(2024, 3, 5)), None), &tl, today());
        assert_eq!(pos, GridPosition { start_column: 2, span: 3, clamped: false });

        let pos = task_grid_position(&task(Some(d(2024, 2, 1)), Some(d(2024, 4, 1)), None), &tl, today());
        assert_eq!(pos.start_column, 0);
        assert_eq!(pos.span, 10);
        assert!(pos.clamped);

        let pos = task_grid_position(&task(Some(d(2024, 5, 1)), Some(d(2024, 5, 2)), None), &tl, today());
        assert_eq!(pos.start_column, 9);
        assert_eq!(pos.span, 1);
    }

    #[test]
    fn grid_position_round_trips_into_start_unit() {
        for mode in [ViewMode::Days, ViewMode::Weeks, ViewMode::Months] {
            let tl = Timeline::new(d(2024, 1, 1), d(2024, 6, 30), mode);
            for offset in [0i64, 3, 17, 45, 120] {
                let start = d(2024, 1, 1) + TimeDelta::days(offset);
                let t = task(Some(start), None, Some(24.0));
                let pos = task_grid_position(&t, &tl, today());
                let unit = &tl.units[pos.start_column];
                assert!(unit.start <= start && start < period_end(unit.start, mode), "{mode:?} {start}");
                assert_eq!(tl.column_of(unit.start), pos.start_column);
            }
        }
    }

    #[test]
    fn empty_timeline_positions_at_origin() {
        let tl = Timeline::new(d(2024, 3, 10), d(2024, 3, 1), ViewMode::Days);
        let pos = task_grid_position(&task(None, None, None), &tl, today());
        assert_eq!(pos.span, 1);
        assert!(pos.clamped);
    }
}
