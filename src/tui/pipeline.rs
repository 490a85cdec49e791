//! Lead pipeline Kanban board.
//!
//! Stakeholders in the sales pipeline are laid out in one column per lead
//! stage. Ctrl+Left/Right moves the selected lead one stage and the
//! selection follows the card.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::crm::pipeline::{leads_in_stage, pipeline_summary, Direction};
use crate::db::{format_relative, Repository};
use crate::fields::LeadStatus;
use crate::service::Workspace;
use crate::stakeholder::Stakeholder;
use crate::tui::colors::{stage_color, text_on, DARK_PURPLE};

const COLUMN_COUNT: usize = LeadStatus::ALL.len();
const CARD_HEIGHT: usize = 5;

pub struct PipelineApp<R: Repository> {
    ws: Workspace<R>,
    selected_column: usize,
    selected_card: usize,
    column_scroll_offsets: [usize; COLUMN_COUNT],
    status_message: String,
    show_detail: bool,
    filter_active: bool,
    filter_text: String,
    columns: [Vec<u64>; COLUMN_COUNT],
}

impl<R: Repository> PipelineApp<R> {
    pub fn new(ws: Workspace<R>) -> Self {
        let mut app = PipelineApp {
            ws,
            selected_column: 0,
            selected_card: 0,
            column_scroll_offsets: [0; COLUMN_COUNT],
            status_message: String::new(),
            show_detail: false,
            filter_active: false,
            filter_text: String::new(),
            columns: Default::default(),
        };
        app.update_columns();
        app
    }

    fn matches_filter(&self, s: &Stakeholder) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        let needle = self.filter_text.to_lowercase();
        s.company_name.to_lowercase().contains(&needle)
            || s.contact_person.as_deref().is_some_and(|c| c.to_lowercase().contains(&needle))
            || s.specialties.iter().any(|sp| sp.contains(&needle))
    }

    /// Rebuild the columns from the workspace and current filter.
    fn update_columns(&mut self) {
        let stakeholders = &self.ws.db().stakeholders;
        let columns: Vec<Vec<u64>> = LeadStatus::ALL
            .iter()
            .map(|&stage| {
                leads_in_stage(stakeholders, stage)
                    .into_iter()
                    .filter(|s| self.matches_filter(s))
                    .map(|s| s.id)
                    .collect()
            })
            .collect();
        for (slot, ids) in self.columns.iter_mut().zip(columns) {
            *slot = ids;
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = self.columns[self.selected_column].len();
        if len == 0 {
            self.selected_card = 0;
            self.column_scroll_offsets[self.selected_column] = 0;
        } else if self.selected_card >= len {
            self.selected_card = len - 1;
        }
    }

    fn selected_id(&self) -> Option<u64> {
        self.columns[self.selected_column].get(self.selected_card).copied()
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    fn total_cards(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Move the selected lead one stage and keep it selected.
    fn move_card(&mut self, direction: Direction) {
        let Some(id) = self.selected_id() else {
            return;
        };
        match self.ws.move_lead(id, direction) {
            Ok(stage) => {
                self.update_columns();
                self.selected_column = stage.index();
                if let Some(pos) = self.columns[self.selected_column].iter().position(|&c| c == id) {
                    self.selected_card = pos;
                } else {
                    self.clamp_selection();
                }
                self.set_status_message(format!("Moved to {}", stage.label()));
            }
            Err(e) => self.set_status_message(format!("Error: {e}")),
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.filter_active = false;
                self.filter_text.clear();
                self.update_columns();
                self.status_message.clear();
            }
            KeyCode::Enter => {
                self.filter_active = false;
                if self.filter_text.is_empty() {
                    self.set_status_message("Filter cleared");
                } else {
                    let shown = self.total_cards();
                    self.set_status_message(format!("Filter: '{}' ({} leads shown)", self.filter_text, shown));
                }
            }
            KeyCode::Backspace => {
                if self.filter_text.pop().is_some() {
                    self.update_columns();
                }
            }
            KeyCode::Char(c) => {
                self.filter_text.push(c);
                self.update_columns();
            }
            _ => {}
        }
    }

    /// Handle one key press. Returns true when the board should close.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if self.filter_active {
            self.handle_filter_key(key);
            return false;
        }
        self.status_message.clear();

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.show_detail {
                    self.show_detail = false;
                } else {
                    return true;
                }
            }
            KeyCode::Enter => self.show_detail = !self.show_detail,

            // Card movement first, before plain navigation
            KeyCode::Left if key.modifiers.contains(KeyModifiers::CONTROL) => self.move_card(Direction::Back),
            KeyCode::Right if key.modifiers.contains(KeyModifiers::CONTROL) => self.move_card(Direction::Forward),

            KeyCode::Left => {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Right => {
                if self.selected_column + 1 < COLUMN_COUNT {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Up => self.selected_card = self.selected_card.saturating_sub(1),
            KeyCode::Down => {
                if self.selected_card + 1 < self.columns[self.selected_column].len() {
                    self.selected_card += 1;
                }
            }
            KeyCode::Char('/') => {
                self.filter_active = true;
                self.set_status_message("Filter: Type to search company/contact/specialty, Enter to apply, Esc to cancel");
            }
            KeyCode::Char('r') => match self.ws.reload() {
                Ok(()) => {
                    self.update_columns();
                    self.set_status_message("Reloaded");
                }
                Err(e) => self.set_status_message(format!("Error: {e}")),
            },
            KeyCode::Char('h') => {
                self.set_status_message("Help: Enter: Details | Ctrl+←/→: Move stage | /: Filter | r: Reload | q: Exit");
            }
            _ => {}
        }
        false
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_board(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);

        if self.show_detail {
            self.render_detail_popup(f);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let summary = pipeline_summary(&self.ws.db().stakeholders);
        let open: usize = summary
            .stages
            .iter()
            .filter(|s| !s.stage.is_closed())
            .map(|s| s.count)
            .sum();
        let conversion = summary
            .conversion_rate
            .map_or_else(|| "-".to_string(), |r| format!("{:.0}%", r * 100.0));

        let header = Line::from(vec![
            Span::styled("LEAD PIPELINE", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("Open leads: {open}  Conversion: {conversion}"),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ]);
        let block = Paragraph::new(header)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(block, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let constraints: Vec<Constraint> = (0..COLUMN_COUNT)
            .map(|_| Constraint::Ratio(1, COLUMN_COUNT as u32))
            .collect();
        let layout = Layout::default()
            .direction(LayoutDirection::Horizontal)
            .constraints(constraints)
            .split(area);

        for (i, &column_area) in layout.iter().enumerate() {
            self.render_column(f, column_area, i);
        }
    }

    fn render_column(&mut self, f: &mut Frame, area: Rect, index: usize) {
        let stage = LeadStatus::ALL[index];
        let is_selected = index == self.selected_column;
        let color = stage_color(stage);
        let border_style = if is_selected {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({})", stage.label(), self.columns[index].len()))
            .border_style(border_style);
        let inner = block.inner(area);
        f.render_widget(block, area);

        if self.columns[index].is_empty() {
            return;
        }

        let available = inner.height as usize;
        let visible = (available / CARD_HEIGHT).max(1);
        if is_selected {
            let offset = &mut self.column_scroll_offsets[index];
            if self.selected_card < *offset {
                *offset = self.selected_card;
            } else if self.selected_card >= *offset + visible {
                *offset = self.selected_card + 1 - visible;
            }
        }
        let offset = self.column_scroll_offsets[index];

        let mut y = 0;
        let mut rendered = 0;
        for (card_index, &id) in self.columns[index].iter().enumerate().skip(offset) {
            if y + CARD_HEIGHT > available {
                break;
            }
            let Some(s) = self.ws.db().stakeholder(id) else {
                continue;
            };
            let card_area = Rect {
                x: inner.x,
                y: inner.y + y as u16,
                width: inner.width,
                height: CARD_HEIGHT as u16,
            };
            self.render_card(f, card_area, s, stage, is_selected && card_index == self.selected_card);
            y += CARD_HEIGHT;
            rendered += 1;
        }

        if offset > 0 {
            let indicator = Paragraph::new(format!("▲ +{offset} above")).style(Style::default().fg(Color::Cyan));
            f.render_widget(indicator, Rect { x: inner.x, y: inner.y, width: inner.width, height: 1 });
        }
        let remaining = self.columns[index].len().saturating_sub(offset + rendered);
        if remaining > 0 {
            let indicator = Paragraph::new(format!("▼ +{remaining} below")).style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect { x: inner.x, y: inner.y + inner.height.saturating_sub(1), width: inner.width, height: 1 },
            );
        }
    }

    fn render_card(&self, f: &mut Frame, area: Rect, s: &Stakeholder, stage: LeadStatus, is_selected: bool) {
        let color = stage_color(stage);
        let style = if is_selected {
            Style::default().bg(color).fg(text_on(color)).add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(Color::DarkGray)
        };
        let score = s.lead_score.map_or_else(|| "-".to_string(), |v| v.to_string());
        let lines = vec![
            Line::from(format!("#{} {}", s.id, s.company_name)),
            Line::from(s.contact_person.clone().unwrap_or_default()),
            Line::from(format!("Score {} | {}", score, s.stakeholder_type.label())),
        ];
        let card = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .style(style)
            .wrap(Wrap { trim: true });
        f.render_widget(card, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let text = if self.filter_active {
            format!("Filter: {} | Type to search, Enter to apply, Esc to cancel", self.filter_text)
        } else if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let filter = if self.filter_text.is_empty() {
                String::new()
            } else {
                format!(" [Filter: {}]", self.filter_text)
            };
            format!(
                "Leads: {}{} | Ctrl+←/→: Move stage | Enter: Details | /: Filter | h: Help",
                self.total_cards(),
                filter
            )
        };
        let status = Paragraph::new(text)
            .style(Style::default().bg(DARK_PURPLE).fg(text_on(DARK_PURPLE)))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render_detail_popup(&self, f: &mut Frame) {
        let Some(s) = self.selected_id().and_then(|id| self.ws.db().stakeholder(id)) else {
            return;
        };
        let area = f.area();
        let width = area.width * 70 / 100;
        let height = area.height * 70 / 100;
        let popup = Rect::new((area.width - width) / 2, (area.height - height) / 2, width, height);
        f.render_widget(Clear, popup);

        let db = self.ws.db();
        let today = self.ws.today();
        let dash = || "-".to_string();
        let last_contact = db
            .interactions
            .iter()
            .filter(|i| i.stakeholder_id == s.id)
            .max_by_key(|i| i.date)
            .map(|i| format!("{} ({})", i.interaction_type.label(), format_relative(Some(i.date), today)));
        let active = db
            .assignments
            .iter()
            .filter(|a| a.stakeholder_id == s.id && a.status == crate::fields::AssignmentStatus::Active)
            .count();

        let lines = vec![
            Line::from(Span::styled(
                format!("#{}: {}", s.id, s.company_name),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!("Contact:      {}", s.contact_person.clone().unwrap_or_else(dash))),
            Line::from(format!("Email:        {}", s.email.clone().unwrap_or_else(dash))),
            Line::from(format!("Phone:        {}", s.phone.clone().unwrap_or_else(dash))),
            Line::from(format!("Type:         {}", s.stakeholder_type.label())),
            Line::from(format!("Status:       {}", s.status.label())),
            Line::from(format!("Stage:        {}", s.lead_status.map_or("-", LeadStatus::label))),
            Line::from(format!("Score:        {}", s.lead_score.map_or_else(dash, |v| v.to_string()))),
            Line::from(format!("Rating:       {}", s.rating.map_or_else(dash, |r| format!("{r:.1}")))),
            Line::from(format!(
                "Specialties:  {}",
                if s.specialties.is_empty() { dash() } else { s.specialties.join(", ") }
            )),
            Line::from(format!("Assignments:  {active} active")),
            Line::from(format!("Last contact: {}", last_contact.unwrap_or_else(dash))),
            Line::from(""),
            Line::from("Notes:"),
            Line::from(s.notes.clone().unwrap_or_else(dash)),
        ];

        let color = s.lead_status.map_or(DARK_PURPLE, stage_color);
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Lead Details (Press Enter to close)")
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(color).add_modifier(Modifier::BOLD));
        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(paragraph, popup);
    }

    /// Main event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}
