//! # SP - Construction Site Planner
//!
//! A terminal planner for construction projects: a Gantt schedule with
//! dependency-aware drag validation, crew and equipment management, and a
//! stakeholder directory with a lead pipeline.
//!
//! ## Key Features
//!
//! - **Gantt Board**: Day, week and month views with drag-style rescheduling,
//!   live validation, critical-path highlighting and a debug overlay
//! - **Dependencies**: Four link types with lag and cycle rejection
//! - **Resources**: Weekly allocations, utilization, equipment bookings,
//!   maintenance scheduling and conflict detection with suggested fixes
//! - **Stakeholders**: Directory, lead pipeline board, assignments, contact
//!   history with follow-ups, and performance ratings
//! - **Local File Storage**: One JSON workspace with CSV export and backups
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a project and schedule work
//! sp project add "Harbour Apartments" --location "Pier 4"
//! sp task add "Excavation" --project 1 --start 2024-03-11 --hours 40
//! sp task add "Footings" --project 1 --hours 24 --skill concrete
//! sp dep add 1 2
//!
//! # Open the Gantt board
//! sp ui
//!
//! # Check crew and equipment for clashes
//! sp conflicts list
//! ```
//!
//! ## Key Commands
//!
//! - `sp ui` - Gantt board
//! - `sp pipeline` - Lead pipeline board
//! - `sp gantt list|critical|debug|svg` - Chart reports
//! - `sp conflicts list|resolve` - Resource conflicts and fixes
//! - `sp export` - Export tasks to CSV
//! - `sp backup` - Timestamped workspace backup
//!
//! Data is stored in `~/.siteplan/workspace.json` (override with `SP_DIR`
//! or `--db`). Set `SP_LOG=debug` to see what the planner is doing.

use std::fs;

use chrono::Local;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod crew;
pub mod crm;
pub mod db;
pub mod debounce;
pub mod equipment;
pub mod error;
pub mod export;
pub mod fields;
pub mod gantt;
pub mod prefs;
pub mod resources;
pub mod service;
pub mod stakeholder;
pub mod task;
pub mod validate;
pub mod tui {
    pub mod colors;
    pub mod gantt;
    pub mod pipeline;
    pub mod run;
}

use cli::Cli;
use cmd::Context;
use config::Config;

fn init_logging() {
    let filter = EnvFilter::try_from_env("SP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let config = Config::from_env();

    let db_path = cli.db.unwrap_or_else(|| {
        if let Err(e) = fs::create_dir_all(&config.data_dir) {
            eprintln!("Failed to create data directory {}: {}", config.data_dir.display(), e);
            std::process::exit(1);
        }
        config.workspace_path()
    });
    debug!(path = %db_path.display(), "using workspace");

    let ctx = Context {
        db_path,
        config,
        today: Local::now().date_naive(),
    };
    if let Err(e) = cmd::run(cli.command, &ctx) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
