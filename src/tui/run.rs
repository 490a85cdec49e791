//! TUI entry points and terminal setup.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::db::Repository;
use crate::error::AppResult;
use crate::prefs::PreferenceStore;
use crate::service::Workspace;
use crate::tui::gantt::GanttApp;
use crate::tui::pipeline::PipelineApp;

/// Put the terminal in raw alternate-screen mode for the duration of `f`
/// and restore it afterwards, even when `f` fails.
fn with_terminal(f: impl FnOnce(&mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()>) -> AppResult<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = f(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result?;
    Ok(())
}

/// Initialise and run the Gantt board.
pub fn run_gantt<R: Repository>(workspace: Workspace<R>, prefs: PreferenceStore, debounce: Duration) -> AppResult<()> {
    let mut app = GanttApp::new(workspace, prefs, debounce);
    with_terminal(|terminal| app.run(terminal))
}

/// Initialise and run the lead pipeline board.
pub fn run_pipeline<R: Repository>(workspace: Workspace<R>) -> AppResult<()> {
    let mut app = PipelineApp::new(workspace);
    with_terminal(|terminal| app.run(terminal))
}
