use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Construction project planner: Gantt schedule, crew and equipment, and
/// stakeholder pipeline.
/// Storage defaults to $SP_DIR/workspace.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "sp", version, about = "Construction project planning from the terminal")]
pub struct Cli {
    /// Path to the JSON workspace file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
