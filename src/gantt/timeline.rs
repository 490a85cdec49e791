//! Timeline units and date-to-column resolution.
//!
//! A timeline is an ascending run of units (days, Sunday-aligned weeks or
//! calendar months). Every other piece of the chart (bar positions, drag
//! snapping, the SVG header) is expressed in column indices into it.

use chrono::{Datelike, Months, NaiveDate, NaiveTime, Weekday};

use crate::fields::ViewMode;
use crate::task::Task;

use super::position::{offset_days, task_dates_from_estimate};

/// One column of the timeline grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineUnit {
    /// Epoch milliseconds of the unit start at UTC midnight.
    pub key: i64,
    pub start: NaiveDate,
    pub label: String,
    /// Only ever set in days mode.
    pub is_weekend: bool,
}

pub fn epoch_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    offset_days(date, -(date.weekday().num_days_from_sunday() as i64))
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Start of the period containing `date` in the given mode.
pub fn period_start(date: NaiveDate, mode: ViewMode) -> NaiveDate {
    match mode {
        ViewMode::Days => date,
        ViewMode::Weeks => week_start(date),
        ViewMode::Months => month_start(date),
    }
}

/// Exclusive end of the period starting at `start`.
pub fn period_end(start: NaiveDate, mode: ViewMode) -> NaiveDate {
    match mode {
        ViewMode::Days => offset_days(start, 1),
        ViewMode::Weeks => offset_days(start, 7),
        ViewMode::Months => start.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX),
    }
}

fn unit_label(date: NaiveDate, mode: ViewMode) -> String {
    match mode {
        ViewMode::Days => date.format("%a %-d").to_string(),
        ViewMode::Weeks => date.format("%b %-d").to_string(),
        ViewMode::Months => date.format("%b %Y").to_string(),
    }
}

/// Build the ordered unit sequence covering `[start, end]`.
///
/// The cursor begins at the start of the period containing `start`, so the
/// first unit never begins after `start`. An inverted range yields nothing.
pub fn generate_timeline_units(start: NaiveDate, end: NaiveDate, mode: ViewMode) -> Vec<TimelineUnit> {
    let mut units = Vec::new();
    if start > end {
        return units;
    }
    let mut cursor = period_start(start, mode);
    while cursor <= end {
        units.push(TimelineUnit {
            key: epoch_millis(cursor),
            start: cursor,
            label: unit_label(cursor, mode),
            is_weekend: mode == ViewMode::Days && is_weekend(cursor),
        });
        let next = period_end(cursor, mode);
        if next <= cursor {
            break;
        }
        cursor = next;
    }
    units
}

fn unit_contains(unit: &TimelineUnit, date: NaiveDate, mode: ViewMode) -> bool {
    match mode {
        ViewMode::Days => unit.start == date,
        ViewMode::Weeks => week_start(date) == unit.start,
        ViewMode::Months => unit.start.year() == date.year() && unit.start.month() == date.month(),
    }
}

/// Resolve a date to a column index.
///
/// Dates before the first unit map to 0, dates past the last unit's period
/// map to the last index, anything else to the first unit containing it.
pub fn column_index_for_date(date: NaiveDate, units: &[TimelineUnit], mode: ViewMode) -> usize {
    let (Some(first), Some(last)) = (units.first(), units.last()) else {
        return 0;
    };
    let last_index = units.len() - 1;
    if date < first.start {
        return 0;
    }
    if date >= period_end(last.start, mode) {
        return last_index;
    }
    units
        .iter()
        .position(|u| unit_contains(u, date, mode))
        .unwrap_or(last_index)
}

/// A generated unit sequence together with the range and mode it came from.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub mode: ViewMode,
    pub units: Vec<TimelineUnit>,
}

impl Timeline {
    pub fn new(start: NaiveDate, end: NaiveDate, mode: ViewMode) -> Self {
        Timeline {
            start,
            end,
            mode,
            units: generate_timeline_units(start, end, mode),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn column_of(&self, date: NaiveDate) -> usize {
        column_index_for_date(date, &self.units, self.mode)
    }

    /// Same range, different granularity.
    pub fn with_mode(&self, mode: ViewMode) -> Self {
        Timeline::new(self.start, self.end, mode)
    }

    /// Index of the unit containing `today`, if it is on the chart.
    pub fn today_column(&self, today: NaiveDate) -> Option<usize> {
        if today < self.start || today > self.end {
            return None;
        }
        Some(self.column_of(today))
    }
}

/// Days of empty chart shown either side of the scheduled work.
pub const CHART_PADDING_DAYS: i64 = 7;

/// Chart range spanning every task's inferred dates plus `padding_days` on
/// both sides. With no tasks, a window around `today`.
pub fn range_for_tasks<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    today: NaiveDate,
    padding_days: i64,
) -> (NaiveDate, NaiveDate) {
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for task in tasks {
        let dates = task_dates_from_estimate(task, today);
        bounds = Some(match bounds {
            None => (dates.start, dates.end),
            Some((lo, hi)) => (lo.min(dates.start), hi.max(dates.end)),
        });
    }
    let (lo, hi) = bounds.unwrap_or((offset_days(today, -7), offset_days(today, 30)));
    (offset_days(lo, -padding_days), offset_days(hi, padding_days))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn days_mode_emits_one_unit_per_day_with_weekends_flagged() {
        let units = generate_timeline_units(d(2024, 3, 1), d(2024, 3, 4), ViewMode::Days);
        assert_eq!(units.len(), 4);
        assert_eq!(units[0].label, "Fri 1");
        assert!(!units[0].is_weekend);
        assert!(units[1].is_weekend);
        assert!(units[2].is_weekend);
        assert!(!units[3].is_weekend);
    }

    #[test]
    fn weeks_mode_aligns_to_sunday() {
        // 2024-03-06 is a Wednesday.
        let units = generate_timeline_units(d(2024, 3, 6), d(2024, 3, 20), ViewMode::Weeks);
        let starts: Vec<_> = units.iter().map(|u| u.start).collect();
        assert_eq!(starts, vec![d(2024, 3, 3), d(2024, 3, 10), d(2024, 3, 17)]);
        assert!(units.iter().all(|u| !u.is_weekend));
        assert_eq!(units[0].label, "Mar 3");
    }

    #[test]
    fn months_mode_steps_calendar_months() {
        let units = generate_timeline_units(d(2024, 1, 31), d(2024, 4, 2), ViewMode::Months);
        let starts: Vec<_> = units.iter().map(|u| u.start).collect();
        assert_eq!(starts, vec![d(2024, 1, 1), d(2024, 2, 1), d(2024, 3, 1), d(2024, 4, 1)]);
        assert_eq!(units[1].label, "Feb 2024");
    }

    #[test]
    fn inverted_range_is_empty() {
        assert!(generate_timeline_units(d(2024, 3, 5), d(2024, 3, 1), ViewMode::Days).is_empty());
    }

    #[test]
    fn keys_strictly_ascend_and_cover_range_in_every_mode() {
        let ranges = [
            (d(2023, 12, 28), d(2024, 2, 3)),
            (d(2024, 2, 29), d(2024, 3, 1)),
            (d(2024, 6, 15), d(2024, 6, 15)),
            (d(2024, 1, 1), d(2025, 1, 1)),
        ];
        for (start, end) in ranges {
            for mode in [ViewMode::Days, ViewMode::Weeks, ViewMode::Months] {
                let units = generate_timeline_units(start, end, mode);
                assert!(!units.is_empty());
                assert!(units.windows(2).all(|w| w[0].key < w[1].key), "{mode:?} {start}..{end}");
                assert!(units[0].start <= start);
                let last = units.last().unwrap();
                assert!(period_end(last.start, mode) > end);
            }
        }
    }

    #[test]
    fn key_is_epoch_millis_of_unit_start() {
        let units = generate_timeline_units(d(1970, 1, 2), d(1970, 1, 2), ViewMode::Days);
        assert_eq!(units[0].key, 86_400_000);
    }

    #[test]
    fn column_index_clamps_and_contains() {
        let units = generate_timeline_units(d(2024, 3, 3), d(2024, 3, 23), ViewMode::Weeks);
        assert_eq!(units.len(), 3);
        assert_eq!(column_index_for_date(d(2024, 2, 1), &units, ViewMode::Weeks), 0);
        assert_eq!(column_index_for_date(d(2024, 3, 9), &units, ViewMode::Weeks), 0);
        assert_eq!(column_index_for_date(d(2024, 3, 10), &units, ViewMode::Weeks), 1);
        assert_eq!(column_index_for_date(d(2024, 3, 23), &units, ViewMode::Weeks), 2);
        assert_eq!(column_index_for_date(d(2024, 3, 24), &units, ViewMode::Weeks), 2);
        assert_eq!(column_index_for_date(d(2025, 1, 1), &units, ViewMode::Weeks), 2);
        assert_eq!(column_index_for_date(d(2024, 3, 9), &[], ViewMode::Weeks), 0);
    }

    #[test]
    fn column_index_months_uses_calendar_month() {
        let units = generate_timeline_units(d(2024, 1, 15), d(2024, 3, 15), ViewMode::Months);
        assert_eq!(column_index_for_date(d(2024, 2, 29), &units, ViewMode::Months), 1);
        assert_eq!(column_index_for_date(d(2024, 3, 31), &units, ViewMode::Months), 2);
        assert_eq!(column_index_for_date(d(2024, 4, 1), &units, ViewMode::Months), 2);
    }

    #[test]
    fn column_index_is_monotonic() {
        for mode in [ViewMode::Days, ViewMode::Weeks, ViewMode::Months] {
            let units = generate_timeline_units(d(2024, 1, 10), d(2024, 5, 20), mode);
            let mut date = d(2023, 12, 1);
            let mut prev = 0;
            while date < d(2024, 7, 1) {
                let idx = column_index_for_date(date, &units, mode);
                assert!(idx >= prev, "{mode:?} regressed at {date}");
                assert!(idx < units.len());
                prev = idx;
                date = date + Duration::days(1);
            }
        }
    }

    #[test]
    fn range_for_tasks_pads_inferred_dates() {
        let today = d(2024, 3, 13);
        let mut t = Task::new(1, "Pour footings", 0);
        t.start_date = Some(d(2024, 3, 1));
        t.due_date = Some(d(2024, 3, 20));
        let (lo, hi) = range_for_tasks([&t], today, 2);
        assert_eq!((lo, hi), (d(2024, 2, 28), d(2024, 3, 22)));

        let empty: Vec<Task> = Vec::new();
        let (lo, hi) = range_for_tasks(&empty, today, 0);
        assert_eq!((lo, hi), (d(2024, 3, 6), d(2024, 4, 12)));
    }

    #[test]
    fn range_at_calendar_end_stays_on_the_calendar() {
        let mut t = Task::new(1, "Pour footings", 0);
        t.start_date = Some(NaiveDate::MAX);
        t.estimated_hours = Some(1e12);
        let (lo, hi) = range_for_tasks([&t], d(2024, 3, 13), CHART_PADDING_DAYS);
        assert_eq!(hi, NaiveDate::MAX);
        assert_eq!(lo, NaiveDate::MAX - Duration::days(CHART_PADDING_DAYS));
        let units = generate_timeline_units(lo, hi, ViewMode::Days);
        assert_eq!(units.len(), CHART_PADDING_DAYS as usize + 1);
        assert!(!generate_timeline_units(lo, hi, ViewMode::Weeks).is_empty());
    }

    #[test]
    fn today_column_only_inside_range() {
        let tl = Timeline::new(d(2024, 3, 1), d(2024, 3, 10), ViewMode::Days);
        assert_eq!(tl.today_column(d(2024, 3, 4)), Some(3));
        assert_eq!(tl.today_column(d(2024, 4, 4)), None);
        assert_eq!(tl.with_mode(ViewMode::Weeks).mode, ViewMode::Weeks);
    }
}
