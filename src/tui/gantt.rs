//! Gantt board interface.
//!
//! Tasks are drawn as bars on the date grid. A task is rescheduled by
//! picking it up, nudging it along the grid while the drop is validated
//! live, and dropping it. Conflict detection re-runs once edits settle.

use std::collections::BTreeMap;
use std::io;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tracing::debug;

use crate::db::{format_date, truncate, Repository};
use crate::debounce::Debouncer;
use crate::fields::ViewMode;
use crate::gantt::critical::{critical_tasks, CriticalReason};
use crate::gantt::debug::diagnostics;
use crate::gantt::drag::{rescheduled_dates, shift_by_units, DragValidation, Validity};
use crate::gantt::position::{
    position_for_dates, task_dates_from_estimate, task_grid_position, DateSource, GridPosition, TaskDates,
};
use crate::gantt::timeline::{range_for_tasks, Timeline, CHART_PADDING_DAYS};
use crate::prefs::{PreferenceStore, Preferences};
use crate::resources::conflict::{Conflict, Severity};
use crate::service::Workspace;
use crate::task::Task;
use crate::tui::colors::{text_on, validity_color, DARK_RED, GOLD, STEEL_BLUE, WEEKEND};

const LABEL_WIDTH: usize = 26;

fn cell_width(mode: ViewMode) -> usize {
    match mode {
        ViewMode::Days => 3,
        ViewMode::Weeks => 6,
        ViewMode::Months => 8,
    }
}

/// Pad or cut `s` to exactly `width` columns.
fn fit(s: &str, width: usize) -> String {
    let cut: String = s.chars().take(width.saturating_sub(1)).collect();
    format!("{cut:<width$}")
}

/// A task picked up and being moved.
struct Drag {
    task_id: u64,
    proposed: NaiveDate,
    validation: DragValidation,
}

pub struct GanttApp<R: Repository> {
    ws: Workspace<R>,
    prefs_store: PreferenceStore,
    prefs: Preferences,
    mode: ViewMode,
    project: Option<u64>,
    rows: Vec<u64>,
    selected: usize,
    row_offset: usize,
    column_offset: usize,
    visible_columns: usize,
    timeline: Timeline,
    critical: BTreeMap<u64, Vec<CriticalReason>>,
    show_critical: bool,
    show_dependencies: bool,
    drag: Option<Drag>,
    conflicts: Vec<Conflict>,
    conflict_check: Debouncer,
    status_message: String,
}

impl<R: Repository> GanttApp<R> {
    pub fn new(ws: Workspace<R>, prefs_store: PreferenceStore, debounce: Duration) -> Self {
        let prefs = prefs_store.load();
        let today = ws.today();
        let conflicts = ws.conflicts();
        let mut app = GanttApp {
            ws,
            prefs_store,
            prefs,
            mode: ViewMode::default(),
            project: None,
            rows: Vec::new(),
            selected: 0,
            row_offset: 0,
            column_offset: 0,
            visible_columns: 30,
            timeline: Timeline::new(today, today, ViewMode::default()),
            critical: BTreeMap::new(),
            show_critical: true,
            show_dependencies: false,
            drag: None,
            conflicts,
            conflict_check: Debouncer::new(debounce),
            status_message: String::new(),
        };
        app.refresh();
        app.scroll_to_today();
        app
    }

    /// Tasks on the board in row order.
    fn board_tasks(&self) -> Vec<Task> {
        self.rows
            .iter()
            .filter_map(|id| self.ws.db().task(*id))
            .cloned()
            .collect()
    }

    /// Rebuild rows, timeline and overlays from the workspace.
    fn refresh(&mut self) {
        let today = self.ws.today();
        let db = self.ws.db();
        let mut tasks: Vec<&Task> = db.tasks_in(self.project);
        tasks.sort_by_key(|t| (task_dates_from_estimate(t, today).start, t.id));
        self.rows = tasks.iter().map(|t| t.id).collect();

        let (start, end) = range_for_tasks(tasks.iter().copied(), today, CHART_PADDING_DAYS);
        self.timeline = Timeline::new(start, end, self.mode);

        let owned: Vec<Task> = tasks.into_iter().cloned().collect();
        self.critical = critical_tasks(&owned, &db.dependencies, today);

        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
        self.column_offset = self.column_offset.min(self.timeline.len().saturating_sub(1));
    }

    fn selected_task(&self) -> Option<&Task> {
        self.rows.get(self.selected).and_then(|id| self.ws.db().task(*id))
    }

    fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.timeline.start, self.timeline.end)
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    fn ensure_column_visible(&mut self, column: usize) {
        let visible = self.visible_columns.max(1);
        if column < self.column_offset {
            self.column_offset = column;
        } else if column >= self.column_offset + visible {
            self.column_offset = column + 1 - visible;
        }
    }

    fn scroll_to_today(&mut self) {
        if let Some(col) = self.timeline.today_column(self.ws.today()) {
            self.column_offset = col.saturating_sub(self.visible_columns / 4);
        }
    }

    fn scroll(&mut self, delta: isize) {
        let max = self.timeline.len().saturating_sub(self.visible_columns.max(1));
        self.column_offset = self.column_offset.saturating_add_signed(delta).min(max);
    }

    /// Handle one key press. Returns true when the board should close.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if self.drag.is_some() {
            self.handle_drag_key(key, now);
            return false;
        }
        self.status_message.clear();

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.rows.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Left => self.scroll(-1),
            KeyCode::Right => self.scroll(1),
            KeyCode::PageUp => self.scroll(-(self.visible_columns as isize)),
            KeyCode::PageDown => self.scroll(self.visible_columns as isize),
            KeyCode::Char('v') => {
                self.mode = self.mode.next();
                self.refresh();
                self.scroll_to_today();
                self.set_status_message(format!("View: {}", self.mode.label()));
            }
            KeyCode::Char('t') => self.scroll_to_today(),
            KeyCode::Enter | KeyCode::Char(' ') => self.pick_up(),
            KeyCode::Char('c') => {
                self.show_critical = !self.show_critical;
                let state = if self.show_critical { "on" } else { "off" };
                self.set_status_message(format!("Critical path overlay {state}"));
            }
            KeyCode::Char('D') => self.toggle_debug(),
            KeyCode::Char('l') => self.show_dependencies = !self.show_dependencies,
            KeyCode::Char('p') => self.cycle_project(),
            KeyCode::Char('r') => match self.ws.reload() {
                Ok(()) => {
                    self.refresh();
                    self.conflicts = self.ws.conflicts();
                    self.set_status_message("Reloaded");
                }
                Err(e) => self.set_status_message(format!("Error: {e}")),
            },
            KeyCode::Char('?') => self.set_status_message(
                "Enter: Pick up | ←/→: Scroll | v: View | t: Today | c: Critical | D: Debug | l: Links | p: Project | r: Reload | q: Quit",
            ),
            _ => {}
        }
        false
    }

    fn handle_drag_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc => {
                self.drag = None;
                self.set_status_message("Move cancelled");
            }
            KeyCode::Left => self.nudge(-1),
            KeyCode::Right => self.nudge(1),
            KeyCode::Enter | KeyCode::Char(' ') => self.drop_task(now),
            _ => {}
        }
    }

    fn preview(&self, task_id: u64, proposed: NaiveDate) -> DragValidation {
        self.ws
            .preview_move(task_id, Some(proposed), self.range())
            .unwrap_or_else(|e| DragValidation {
                validity: Validity::Invalid,
                messages: vec![e.to_string()],
            })
    }

    fn pick_up(&mut self) {
        let today = self.ws.today();
        let Some((task_id, start, title)) = self
            .selected_task()
            .map(|t| (t.id, task_dates_from_estimate(t, today).start, t.title.clone()))
        else {
            return;
        };
        let validation = self.preview(task_id, start);
        self.drag = Some(Drag { task_id, proposed: start, validation });
        self.set_status_message(format!("Moving '{title}'"));
    }

    fn nudge(&mut self, delta: i64) {
        let Some((task_id, proposed)) = self.drag.as_ref().map(|d| (d.task_id, d.proposed)) else {
            return;
        };
        let proposed = shift_by_units(proposed, self.mode, delta);
        let validation = self.preview(task_id, proposed);
        self.drag = Some(Drag { task_id, proposed, validation });
        let column = self.timeline.column_of(proposed);
        self.ensure_column_visible(column);
    }

    fn drop_task(&mut self, now: Instant) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        match self.ws.move_task(drag.task_id, Some(drag.proposed), self.range()) {
            Ok(validation) => {
                let msg = if validation.messages.is_empty() {
                    format!("Moved to {}", drag.proposed)
                } else {
                    format!("Moved to {} ({})", drag.proposed, validation.messages.join("; "))
                };
                self.set_status_message(msg);
                self.refresh();
                if let Some(row) = self.rows.iter().position(|id| *id == drag.task_id) {
                    self.selected = row;
                }
                self.conflict_check.trigger(now);
            }
            Err(e) => self.set_status_message(format!("Error: {e}")),
        }
    }

    fn toggle_debug(&mut self) {
        let enabled = !self.prefs.gantt_debug_mode;
        match self.prefs_store.update(|p| p.gantt_debug_mode = enabled) {
            Ok(saved) => {
                self.prefs = saved;
                let state = if enabled { "on" } else { "off" };
                self.set_status_message(format!("Debug overlay {state}"));
            }
            Err(e) => self.set_status_message(format!("Error: {e}")),
        }
    }

    fn cycle_project(&mut self) {
        let ids: Vec<u64> = self.ws.db().projects.iter().map(|p| p.id).collect();
        self.project = match self.project {
            None => ids.first().copied(),
            Some(current) => ids
                .iter()
                .position(|id| *id == current)
                .and_then(|i| ids.get(i + 1))
                .copied(),
        };
        self.selected = 0;
        self.row_offset = 0;
        self.refresh();
        self.scroll_to_today();
        let name = self.project_name();
        self.set_status_message(format!("Project: {name}"));
    }

    fn project_name(&self) -> String {
        match self.project {
            None => "All projects".to_string(),
            Some(id) => self
                .ws
                .db()
                .project(id)
                .map_or_else(|| format!("#{id}"), |p| p.name.clone()),
        }
    }

    /// Re-run conflict detection once the debounce delay has passed.
    pub fn tick(&mut self, now: Instant) {
        if self.conflict_check.ready(now) {
            self.conflicts = self.ws.conflicts();
            debug!(conflicts = self.conflicts.len(), "conflicts refreshed");
        }
    }

    fn render(&mut self, f: &mut Frame) {
        let deps_height = if self.show_dependencies { 7 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(deps_height),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        let chart_area = if self.prefs.gantt_debug_mode {
            let parts = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                .split(chunks[1]);
            self.render_debug(f, parts[1]);
            parts[0]
        } else {
            chunks[1]
        };
        self.render_chart(f, chart_area);
        if self.show_dependencies {
            self.render_dependencies(f, chunks[2]);
        }
        self.render_status_bar(f, chunks[3]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let critical = self.conflicts.iter().filter(|c| c.severity == Severity::Critical).count();
        let conflict_style = if critical > 0 {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else if self.conflicts.is_empty() {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Yellow)
        };
        let header = Line::from(vec![
            Span::styled("GANTT BOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("{}  {} view  Today: {}", self.project_name(), self.mode.label(), self.ws.today()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
            Span::raw("  "),
            Span::styled(
                format!("Conflicts: {} ({} critical)", self.conflicts.len(), critical),
                conflict_style,
            ),
        ]);
        let block = Paragraph::new(header)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(block, area);
    }

    /// Bar placement for the row of `task`, plus the drop preview if it is
    /// the task being moved.
    fn drag_preview(&self, task: &Task) -> Option<(GridPosition, Validity)> {
        let drag = self.drag.as_ref().filter(|d| d.task_id == task.id)?;
        let (start, end) = rescheduled_dates(task, drag.proposed, self.ws.today());
        let dates = TaskDates { start, end, source: DateSource::Explicit };
        Some((position_for_dates(&dates, &self.timeline), drag.validation.validity))
    }

    fn render_chart(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title(format!(" {} ", self.mode.label()));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let cw = cell_width(self.mode);
        self.visible_columns = ((inner.width as usize).saturating_sub(LABEL_WIDTH) / cw).max(1);
        let rows_visible = (inner.height as usize).saturating_sub(1).max(1);
        if self.selected < self.row_offset {
            self.row_offset = self.selected;
        } else if self.selected >= self.row_offset + rows_visible {
            self.row_offset = self.selected + 1 - rows_visible;
        }

        let today = self.ws.today();
        let today_col = self.timeline.today_column(today);
        let first = self.column_offset.min(self.timeline.len());
        let last = (first + self.visible_columns).min(self.timeline.len());

        let mut lines = Vec::new();
        let mut header = vec![Span::raw(fit("Task", LABEL_WIDTH))];
        for col in first..last {
            let unit = &self.timeline.units[col];
            let style = if Some(col) == today_col {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else if unit.is_weekend {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            header.push(Span::styled(fit(&unit.label, cw), style));
        }
        lines.push(Line::from(header));

        for (row, id) in self.rows.iter().enumerate().skip(self.row_offset).take(rows_visible) {
            let Some(task) = self.ws.db().task(*id) else {
                continue;
            };
            let pos = task_grid_position(task, &self.timeline, today);
            let preview = self.drag_preview(task);
            let is_critical = self.show_critical && self.critical.contains_key(&task.id);

            let label_style = if row == self.selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else if is_critical {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            let mut spans = vec![Span::styled(fit(&format!("#{} {}", task.id, task.title), LABEL_WIDTH), label_style)];

            let bar_bg = if task.is_milestone() {
                GOLD
            } else if is_critical {
                DARK_RED
            } else {
                STEEL_BLUE
            };
            for col in first..last {
                let in_bar = col >= pos.start_column && col < pos.start_column + pos.span;
                let in_preview = preview.is_some_and(|(p, _)| col >= p.start_column && col < p.start_column + p.span);
                let weekend = self.timeline.units[col].is_weekend;
                let span = if let Some((_, validity)) = preview.filter(|_| in_preview) {
                    let bg = validity_color(validity);
                    Span::styled(" ".repeat(cw), Style::default().bg(bg))
                } else if in_bar && task.is_milestone() {
                    Span::styled(fit("◆", cw), Style::default().fg(GOLD).add_modifier(Modifier::BOLD))
                } else if in_bar {
                    let filled = (cw * usize::from(task.progress)).div_ceil(100).min(cw);
                    let text = format!("{}{}", "▓".repeat(filled), " ".repeat(cw - filled));
                    let style = Style::default().bg(bar_bg).fg(text_on(bar_bg));
                    Span::styled(text, if preview.is_some() { style.add_modifier(Modifier::DIM) } else { style })
                } else if Some(col) == today_col {
                    Span::styled(fit("│", cw), Style::default().fg(Color::Cyan))
                } else if weekend {
                    Span::styled(" ".repeat(cw), Style::default().bg(WEEKEND))
                } else {
                    Span::raw(" ".repeat(cw))
                };
                spans.push(span);
            }
            lines.push(Line::from(spans));
        }

        if self.rows.is_empty() {
            lines.push(Line::from(Span::styled(
                "No tasks. Add one with `sp task add`.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        f.render_widget(Paragraph::new(lines), inner);
    }

    fn render_debug(&self, f: &mut Frame, area: Rect) {
        let tasks = self.board_tasks();
        let report = diagnostics(&tasks, &self.timeline, self.ws.today());
        let lines: Vec<Line> = report
            .lines(&self.prefs.gantt_debug_preferences)
            .into_iter()
            .map(Line::from)
            .collect();
        let panel = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Debug "))
            .wrap(Wrap { trim: true });
        f.render_widget(panel, area);
    }

    fn render_dependencies(&self, f: &mut Frame, area: Rect) {
        let db = self.ws.db();
        let mut lines = Vec::new();
        if let Some(task) = self.selected_task() {
            let title = |id: u64| db.task(id).map_or_else(|| format!("#{id}"), |t| format!("#{id} {}", t.title));
            for dep in db.dependencies.iter().filter(|d| d.predecessor_id == task.id || d.successor_id == task.id) {
                let lag = if dep.lag_days == 0 { String::new() } else { format!(" lag {}d", dep.lag_days) };
                lines.push(Line::from(format!(
                    "{} -> {}  {}{}",
                    truncate(&title(dep.predecessor_id), 30),
                    truncate(&title(dep.successor_id), 30),
                    dep.dependency_type.label(),
                    lag
                )));
            }
            if let Some(reasons) = self.critical.get(&task.id) {
                let labels: Vec<&str> = reasons.iter().map(|r| r.label()).collect();
                lines.push(Line::from(Span::styled(
                    format!("Critical: {}", labels.join(", ")),
                    Style::default().fg(Color::Red),
                )));
            }
            lines.push(Line::from(format!(
                "Start {}  Due {}  {}%",
                format_date(task.start_date),
                format_date(task.due_date),
                task.progress
            )));
        }
        let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Links "));
        f.render_widget(panel, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, bg) = match &self.drag {
            Some(drag) => {
                let detail = if drag.validation.messages.is_empty() {
                    String::new()
                } else {
                    format!(": {}", drag.validation.messages.join("; "))
                };
                (
                    format!(
                        "Drop on {} [{}]{} | ←/→: Shift | Enter: Drop | Esc: Cancel",
                        drag.proposed,
                        drag.validation.validity.label(),
                        detail
                    ),
                    validity_color(drag.validation.validity),
                )
            }
            None if !self.status_message.is_empty() => (self.status_message.clone(), STEEL_BLUE),
            None => (
                format!(
                    "Tasks: {} | Enter: Pick up | v: View | c: Critical | D: Debug | l: Links | ?: Help",
                    self.rows.len()
                ),
                STEEL_BLUE,
            ),
        };
        let status = Paragraph::new(text)
            .style(Style::default().bg(bg).fg(text_on(bg)))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Main event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key, Instant::now()) {
                        break;
                    }
                }
            }
            self.tick(Instant::now());
        }
        Ok(())
    }
}
