//! Static SVG rendering of the Gantt chart for sharing outside the terminal.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::fields::ViewMode;
use crate::task::{Task, TaskDependency};

use super::critical::CriticalReason;
use super::dependency::{arrow_path, svg_path, BarRect};
use super::position::task_grid_position;
use super::timeline::Timeline;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgOptions {
    pub column_width: f64,
    pub row_height: f64,
    pub label_width: f64,
    pub header_height: f64,
}

impl SvgOptions {
    pub fn for_mode(mode: ViewMode) -> Self {
        let column_width = match mode {
            ViewMode::Days => 28.0,
            ViewMode::Weeks => 48.0,
            ViewMode::Months => 96.0,
        };
        SvgOptions {
            column_width,
            row_height: 24.0,
            label_width: 200.0,
            header_height: 32.0,
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the chart. Rows follow the order of `tasks`.
pub fn render_svg(
    tasks: &[Task],
    dependencies: &[TaskDependency],
    timeline: &Timeline,
    critical: &BTreeMap<u64, Vec<CriticalReason>>,
    today: NaiveDate,
    opts: SvgOptions,
) -> String {
    let grid_width = timeline.len() as f64 * opts.column_width;
    let width = opts.label_width + grid_width;
    let height = opts.header_height + tasks.len() as f64 * opts.row_height;
    let mut out = String::new();

    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" font-family="sans-serif" font-size="11">"#
    );
    let _ = writeln!(
        out,
        r##"<defs><marker id="arrow" markerWidth="6" markerHeight="6" refX="5" refY="3" orient="auto"><path d="M0,0 L6,3 L0,6 z" fill="#555"/></marker></defs>"##
    );

    for (i, unit) in timeline.units.iter().enumerate() {
        let x = opts.label_width + i as f64 * opts.column_width;
        if unit.is_weekend {
            let _ = writeln!(
                out,
                r##"<rect x="{x}" y="{}" width="{}" height="{}" fill="#f2f2f2"/>"##,
                opts.header_height,
                opts.column_width,
                height - opts.header_height
            );
        }
        let _ = writeln!(
            out,
            r##"<line x1="{x}" y1="0" x2="{x}" y2="{height}" stroke="#ddd"/><text x="{}" y="{}">{}</text>"##,
            x + 3.0,
            opts.header_height - 10.0,
            escape_xml(&unit.label)
        );
    }

    if let Some(col) = timeline.today_column(today) {
        let x = opts.label_width + (col as f64 + 0.5) * opts.column_width;
        let _ = writeln!(
            out,
            r##"<line x1="{x}" y1="{}" x2="{x}" y2="{height}" stroke="#1e88e5" stroke-dasharray="4 2"/>"##,
            opts.header_height
        );
    }

    let mut bars: HashMap<u64, BarRect> = HashMap::new();
    for (row, task) in tasks.iter().enumerate() {
        let pos = task_grid_position(task, timeline, today);
        let x = opts.label_width + pos.start_column as f64 * opts.column_width;
        let bar_width = pos.span as f64 * opts.column_width;
        let y = opts.header_height + row as f64 * opts.row_height;
        bars.insert(task.id, BarRect { x, width: bar_width, row });

        let _ = writeln!(
            out,
            r#"<text x="6" y="{}">{}</text>"#,
            y + opts.row_height / 2.0 + 4.0,
            escape_xml(&task.title)
        );

        let stroke = if critical.contains_key(&task.id) {
            r##" stroke="#d32f2f" stroke-width="2""##
        } else {
            ""
        };
        if task.is_milestone() {
            let cx = x + opts.column_width / 2.0;
            let cy = y + opts.row_height / 2.0;
            let r = opts.row_height / 3.0;
            let _ = writeln!(
                out,
                r##"<polygon points="{cx},{} {},{cy} {cx},{} {},{cy}" fill="#8e24aa"{stroke}/>"##,
                cy - r,
                cx + r,
                cy + r,
                cx - r
            );
        } else {
            let bar_y = y + 4.0;
            let bar_h = opts.row_height - 8.0;
            let _ = writeln!(
                out,
                r##"<rect x="{x}" y="{bar_y}" width="{bar_width}" height="{bar_h}" rx="3" fill="#90caf9"{stroke}/>"##
            );
            if task.progress > 0 {
                let filled = bar_width * f64::from(task.progress.min(100)) / 100.0;
                let _ = writeln!(
                    out,
                    r##"<rect x="{x}" y="{bar_y}" width="{filled}" height="{bar_h}" rx="3" fill="#1565c0"/>"##
                );
            }
        }
    }

    for dep in dependencies {
        let (Some(&from), Some(&to)) = (bars.get(&dep.predecessor_id), bars.get(&dep.successor_id)) else {
            continue;
        };
        let points: Vec<(f64, f64)> = arrow_path(from, to, dep.dependency_type, opts.row_height)
            .into_iter()
            .map(|(x, y)| (x, y + opts.header_height))
            .collect();
        let _ = writeln!(
            out,
            r##"<path d="{}" fill="none" stroke="#555" marker-end="url(#arrow)"/>"##,
            svg_path(&points)
        );
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::DependencyType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn renders_bars_milestones_and_arrows() {
        let tl = Timeline::new(d(2024, 3, 1), d(2024, 3, 14), ViewMode::Days);
        let mut a = Task::new(1, "Foundations & footings", 0);
        a.start_date = Some(d(2024, 3, 1));
        a.due_date = Some(d(2024, 3, 5));
        a.progress = 50;
        let mut b = Task::new(2, "Handover", 0);
        b.start_date = Some(d(2024, 3, 10));
        b.due_date = Some(d(2024, 3, 10));
        b.category = Some("milestone".into());
        let deps = vec![TaskDependency {
            id: 1,
            predecessor_id: 1,
            successor_id: 2,
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
        }];
        let mut critical = BTreeMap::new();
        critical.insert(1, vec![CriticalReason::LongestChain]);

        let svg = render_svg(&[a, b], &deps, &tl, &critical, d(2024, 3, 6), SvgOptions::for_mode(ViewMode::Days));
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Foundations &amp; footings"));
        assert!(svg.contains("<polygon"));
        assert!(svg.contains(r##"stroke="#d32f2f""##));
        assert!(svg.contains("marker-end"));
        assert!(svg.contains("stroke-dasharray"));
        // Mar 2, 3, 9 and 10.
        assert_eq!(svg.matches(r##"fill="#f2f2f2""##).count(), 4);
    }

    #[test]
    fn arrow_marker_is_defined_once() {
        let tl = Timeline::new(d(2024, 3, 1), d(2024, 3, 3), ViewMode::Days);
        let svg = render_svg(&[], &[], &tl, &BTreeMap::new(), d(2024, 3, 2), SvgOptions::for_mode(ViewMode::Days));
        assert_eq!(svg.matches(r#"<marker id="arrow""#).count(), 1);
        assert!(svg.contains(r##"<path d="M0,0 L6,3 L0,6 z" fill="#555"/></marker></defs>"##));
    }
}
