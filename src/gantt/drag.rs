//! Drag-to-reschedule: snapping a pointer offset to a date and judging
//! whether the proposed move is acceptable.

use chrono::{Months, NaiveDate};

use crate::fields::{Priority, ViewMode};
use crate::task::Task;

use super::position::{offset_days, task_dates_from_estimate};
use super::timeline::{is_weekend, Timeline};

/// Outcome severity. Ordered so the worst finding wins via `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Validity {
    Valid,
    Warning,
    Invalid,
}

impl Validity {
    pub fn label(self) -> &'static str {
        match self {
            Validity::Valid => "valid",
            Validity::Warning => "warning",
            Validity::Invalid => "invalid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragValidation {
    pub validity: Validity,
    pub messages: Vec<String>,
}

impl DragValidation {
    fn new() -> Self {
        DragValidation {
            validity: Validity::Valid,
            messages: Vec::new(),
        }
    }

    fn rejected(msg: &str) -> Self {
        DragValidation {
            validity: Validity::Invalid,
            messages: vec![msg.to_string()],
        }
    }

    fn flag(&mut self, validity: Validity, msg: String) {
        self.validity = self.validity.max(validity);
        self.messages.push(msg);
    }

    pub fn is_allowed(&self) -> bool {
        self.validity != Validity::Invalid
    }
}

/// Everything a drag is judged against besides the task itself.
#[derive(Debug, Clone, Copy)]
pub struct DragContext<'a> {
    pub timeline_start: NaiveDate,
    pub timeline_end: NaiveDate,
    /// Currently loaded tasks, used for assignee overlap checks.
    pub tasks: &'a [Task],
    pub today: NaiveDate,
}

/// Validate moving `task` so that it starts on `proposed`.
///
/// `None` means the pointer did not land on a date. Apart from that and an
/// inverted timeline, every check runs and the most severe result wins.
pub fn validate_drag(task: &Task, proposed: Option<NaiveDate>, ctx: &DragContext<'_>) -> DragValidation {
    let Some(new_start) = proposed else {
        return DragValidation::rejected("Invalid date");
    };
    if ctx.timeline_start > ctx.timeline_end {
        return DragValidation::rejected("Invalid timeline range");
    }

    let mut result = DragValidation::new();
    let lower = offset_days(ctx.timeline_start, -1);
    let upper = offset_days(ctx.timeline_end, 1);

    if new_start < lower || new_start > upper {
        result.flag(Validity::Invalid, "Date is outside the timeline".to_string());
    }

    if is_weekend(new_start) {
        result.flag(Validity::Warning, "Task would start on a weekend".to_string());
    }

    let current = task_dates_from_estimate(task, ctx.today);
    let new_end = offset_days(new_start, current.duration_days());
    if new_end > upper {
        result.flag(
            Validity::Invalid,
            format!("Task would end on {new_end}, after the timeline ends"),
        );
    }

    if let Some(hours) = task.estimated_hours {
        if hours < 1.0 {
            result.flag(Validity::Warning, "Task duration is under 1 hour".to_string());
        }
    }

    if !task.assignees.is_empty() {
        for other in ctx.tasks.iter().filter(|o| o.id != task.id && !o.is_completed() && task.shares_assignee_with(o)) {
            let theirs = task_dates_from_estimate(other, ctx.today);
            if new_start <= theirs.end && theirs.start <= new_end {
                result.flag(
                    Validity::Warning,
                    format!("Overlaps with '{}' assigned to the same person", other.title),
                );
            }
        }
    }

    if task.priority == Priority::Critical && new_start < current.start {
        result.flag(Validity::Warning, "Moving a critical task earlier".to_string());
    }

    result
}

/// Map a horizontal pixel offset into the grid to the start of the unit
/// under it. Offsets left of the grid or past the last column miss.
pub fn snap_offset_to_date(offset_px: f64, column_width: f64, timeline: &Timeline) -> Option<NaiveDate> {
    if !offset_px.is_finite() || offset_px < 0.0 || column_width <= 0.0 {
        return None;
    }
    let column = (offset_px / column_width).floor() as usize;
    timeline.units.get(column).map(|u| u.start)
}

/// Move a date by whole units of the view mode (keyboard nudging).
pub fn shift_by_units(date: NaiveDate, mode: ViewMode, delta: i64) -> NaiveDate {
    match mode {
        ViewMode::Days => offset_days(date, delta),
        ViewMode::Weeks => offset_days(date, delta.saturating_mul(7)),
        ViewMode::Months => {
            let months = Months::new(delta.unsigned_abs() as u32);
            let shifted = if delta >= 0 {
                date.checked_add_months(months)
            } else {
                date.checked_sub_months(months)
            };
            shifted.unwrap_or(date)
        }
    }
}

/// New `(start_date, due_date)` for a task dropped at `new_start`, keeping
/// its displayed duration.
pub fn rescheduled_dates(task: &Task, new_start: NaiveDate, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let current = task_dates_from_estimate(task, today);
    (new_start, offset_days(new_start, current.duration_days()))
}
