//! Diagnostics behind the Gantt debug overlay.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::ViewMode;
use crate::task::Task;

use super::position::{position_for_dates, task_dates_from_estimate, DateSource, GridPosition, TaskDates};
use super::timeline::{period_end, Timeline};

fn yes() -> bool {
    true
}

/// Which parts of the overlay are shown. Persisted as
/// `gantt-debug-preferences`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DebugPreferences {
    #[serde(default = "yes")]
    pub show_timeline: bool,
    #[serde(default = "yes")]
    pub show_task_positions: bool,
    #[serde(default = "yes")]
    pub show_date_sources: bool,
    #[serde(default = "yes")]
    pub show_anomalies: bool,
}

impl Default for DebugPreferences {
    fn default() -> Self {
        DebugPreferences {
            show_timeline: true,
            show_task_positions: true,
            show_date_sources: true,
            show_anomalies: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDiagnostic {
    pub task_id: u64,
    pub title: String,
    pub dates: TaskDates,
    pub position: GridPosition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GanttDiagnostics {
    pub mode: ViewMode,
    pub range: (NaiveDate, NaiveDate),
    pub unit_count: usize,
    pub first_key: Option<i64>,
    pub last_key: Option<i64>,
    pub tasks: Vec<TaskDiagnostic>,
    pub anomalies: Vec<String>,
}

/// Compute grid diagnostics for every task against the timeline.
pub fn diagnostics(tasks: &[Task], timeline: &Timeline, today: NaiveDate) -> GanttDiagnostics {
    let mut anomalies = Vec::new();
    let grid_start = timeline.units.first().map(|u| u.start);
    let grid_end = timeline.units.last().map(|u| period_end(u.start, timeline.mode));

    let task_rows = tasks
        .iter()
        .map(|task| {
            let dates = task_dates_from_estimate(task, today);
            let position = position_for_dates(&dates, timeline);

            if let (Some(start), Some(due)) = (task.start_date, task.due_date) {
                if due < start {
                    anomalies.push(format!("#{} '{}': due date {due} is before start {start}", task.id, task.title));
                }
            }
            if dates.source == DateSource::Default {
                anomalies.push(format!("#{} '{}': no usable dates, shown at today", task.id, task.title));
            }
            if let (Some(lo), Some(hi)) = (grid_start, grid_end) {
                if dates.end < lo || dates.start >= hi {
                    anomalies.push(format!("#{} '{}': entirely outside the timeline", task.id, task.title));
                } else if position.clamped {
                    anomalies.push(format!("#{} '{}': clipped at the timeline edge", task.id, task.title));
                }
            }

            TaskDiagnostic {
                task_id: task.id,
                title: task.title.clone(),
                dates,
                position,
            }
        })
        .collect();

    GanttDiagnostics {
        mode: timeline.mode,
        range: (timeline.start, timeline.end),
        unit_count: timeline.len(),
        first_key: timeline.units.first().map(|u| u.key),
        last_key: timeline.units.last().map(|u| u.key),
        tasks: task_rows,
        anomalies,
    }
}

impl GanttDiagnostics {
    /// Overlay text, filtered by preferences.
    pub fn lines(&self, prefs: &DebugPreferences) -> Vec<String> {
        let mut out = Vec::new();
        if prefs.show_timeline {
            out.push(format!(
                "mode={} range={}..{} units={} keys={}..{}",
                self.mode.label(),
                self.range.0,
                self.range.1,
                self.unit_count,
                self.first_key.map(|k| k.to_string()).unwrap_or_else(|| "-".into()),
                self.last_key.map(|k| k.to_string()).unwrap_or_else(|| "-".into()),
            ));
        }
        if prefs.show_task_positions || prefs.show_date_sources {
            for t in &self.tasks {
                let mut line = format!("#{:<4}", t.task_id);
                if prefs.show_task_positions {
                    line.push_str(&format!(
                        " col={:<3} span={:<3}{}",
                        t.position.start_column,
                        t.position.span,
                        if t.position.clamped { " clamped" } else { "" }
                    ));
                }
                if prefs.show_date_sources {
                    line.push_str(&format!(" {}..{} ({})", t.dates.start, t.dates.end, t.dates.source.label()));
                }
                out.push(line);
            }
        }
        if prefs.show_anomalies {
            out.extend(self.anomalies.iter().map(|a| format!("! {a}")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dated(id: u64, start: NaiveDate, due: NaiveDate) -> Task {
        let mut t = Task::new(id, format!("T{id}"), 0);
        t.start_date = Some(start);
        t.due_date = Some(due);
        t
    }

    #[test]
    fn flags_anomalies() {
        let tl = Timeline::new(d(2024, 3, 1), d(2024, 3, 10), ViewMode::Days);
        let tasks = vec![
            dated(1, d(2024, 3, 2), d(2024, 3, 4)),
            dated(2, d(2024, 3, 8), d(2024, 3, 20)),
            dated(3, d(2024, 5, 1), d(2024, 5, 3)),
            dated(4, d(2024, 3, 5), d(2024, 3, 3)),
            Task::new(5, "Undated", 0),
        ];
        let diag = diagnostics(&tasks, &tl, d(2024, 3, 6));
        assert_eq!(diag.unit_count, 10);
        assert_eq!(diag.tasks.len(), 5);
        assert!(diag.anomalies.iter().any(|a| a.starts_with("#2") && a.contains("clipped")));
        assert!(diag.anomalies.iter().any(|a| a.starts_with("#3") && a.contains("entirely outside")));
        assert!(diag.anomalies.iter().any(|a| a.starts_with("#4") && a.contains("before start")));
        assert!(diag.anomalies.iter().any(|a| a.starts_with("#5") && a.contains("no usable dates")));
        assert!(!diag.anomalies.iter().any(|a| a.starts_with("#1")));
    }

    #[test]
    fn preferences_filter_lines() {
        let tl = Timeline::new(d(2024, 3, 1), d(2024, 3, 10), ViewMode::Days);
        let tasks = vec![dated(1, d(2024, 3, 2), d(2024, 3, 4))];
        let diag = diagnostics(&tasks, &tl, d(2024, 3, 6));

        let all = diag.lines(&DebugPreferences::default());
        assert_eq!(all.len(), 2);
        assert!(all[0].starts_with("mode=Days"));
        assert!(all[1].contains("col=1"));
        assert!(all[1].contains("(explicit)"));

        let only_timeline = DebugPreferences {
            show_timeline: true,
            show_task_positions: false,
            show_date_sources: false,
            show_anomalies: false,
        };
        assert_eq!(diag.lines(&only_timeline).len(), 1);
    }

    #[test]
    fn preferences_deserialise_with_defaults() {
        let prefs: DebugPreferences = serde_json::from_str(r#"{"showAnomalies":false}"#).unwrap();
        assert!(!prefs.show_anomalies);
        assert!(prefs.show_timeline);
    }
}
