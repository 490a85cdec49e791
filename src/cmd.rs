//! Command implementations for the CLI interface.
//!
//! Each subcommand group maps onto one area of the planner: scheduling,
//! crew and equipment, and the stakeholder directory. Handlers open the
//! workspace, make one change (or print one report) and return.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};

use crate::config::{preferences_path_for, Config};
use crate::crm::directory::{filter_stakeholders, sort_stakeholders, StakeholderFilter};
use crate::crm::interaction::{pending_follow_ups, timeline as interaction_timeline};
use crate::crm::performance::overall_score;
use crate::crm::pipeline::{leads_in_stage, pipeline_summary, Direction};
use crate::db::*;
use crate::error::{AppError, AppResult};
use crate::export::{create_backup, write_tasks_csv, TaskExportFilter};
use crate::fields::*;
use crate::gantt::critical::{critical_tasks, longest_chain};
use crate::gantt::debug::diagnostics;
use crate::gantt::position::task_grid_position;
use crate::gantt::svg::{render_svg, SvgOptions};
use crate::gantt::timeline::{range_for_tasks, week_start, Timeline, CHART_PADDING_DAYS};
use crate::prefs::PreferenceStore;
use crate::service::*;
use crate::stakeholder::Stakeholder;
use crate::task::Task;
use crate::tui::run::{run_gantt, run_pipeline};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive Gantt board.
    Ui,

    /// Launch the lead pipeline board.
    Pipeline,

    /// Create and list projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Schedule and track tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Link tasks with dependencies.
    Dep {
        #[command(subcommand)]
        action: DepAction,
    },

    /// Chart reports: grid placement, critical path, diagnostics, SVG.
    Gantt {
        #[command(subcommand)]
        action: GanttAction,
    },

    /// Manage the crew.
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },

    /// Weekly hour allocations and utilization.
    Alloc {
        #[command(subcommand)]
        action: AllocAction,
    },

    /// Equipment, bookings and maintenance.
    Equipment {
        #[command(subcommand)]
        action: EquipmentAction,
    },

    /// Detect and resolve resource conflicts.
    Conflicts {
        #[command(subcommand)]
        action: ConflictAction,
    },

    /// Stakeholder directory and lead pipeline.
    Stakeholder {
        #[command(subcommand)]
        action: StakeholderAction,
    },

    /// Contact history and follow-ups.
    Interaction {
        #[command(subcommand)]
        action: InteractionAction,
    },

    /// Show or change UI preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Export tasks to CSV.
    Export {
        /// Output file (default: tasks.csv).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Only tasks of this project id.
        #[arg(long)]
        project: Option<u64>,
    },

    /// Copy the workspace file into a timestamped backup.
    Backup,

    /// Generate shell completions.
    Completions {
        /// Shell type: bash | zsh | fish | powershell | elvish
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project.
    Add {
        name: String,
        #[arg(long)]
        location: Option<String>,
        /// Start date: YYYY-MM-DD, "today", "next mon", "in 2w", ...
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// List projects with task counts.
    List,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task.
    Add {
        title: String,
        #[arg(long)]
        project: Option<u64>,
        #[arg(long, value_enum, default_value_t = TaskStatus::NotStarted)]
        status: TaskStatus,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Free-form category; "milestone" draws a diamond.
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Estimated effort in hours.
        #[arg(long)]
        hours: Option<f64>,
        #[arg(long, default_value_t = 0)]
        progress: u8,
        /// Team member ids. Comma-separated or repeated.
        #[arg(long = "assignee")]
        assignees: Vec<String>,
        /// Required skills. Comma-separated or repeated.
        #[arg(long = "skill")]
        skills: Vec<String>,
    },
    /// List tasks.
    List {
        #[arg(long)]
        project: Option<u64>,
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
        #[arg(long, value_enum, default_value_t = SortKey::Start)]
        sort: SortKey,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one task with its dependencies.
    View { id: u64 },
    /// Change task fields.
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        project: Option<u64>,
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        clear_start: bool,
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        hours: Option<f64>,
        #[arg(long)]
        progress: Option<u8>,
        /// Replaces the assignee list.
        #[arg(long = "assignee")]
        assignees: Vec<String>,
        /// Replaces the required skills.
        #[arg(long = "skill")]
        skills: Vec<String>,
    },
    /// Reschedule a task to start on a date, as a drop on the chart would.
    Move {
        id: u64,
        date: String,
        /// Last date the chart may extend to. Defaults to the padded
        /// range of the task's project.
        #[arg(long)]
        until: Option<String>,
        /// Only report what the move would do.
        #[arg(long)]
        dry_run: bool,
    },
    /// Mark a task completed.
    Complete { id: u64 },
}

#[derive(Subcommand)]
pub enum DepAction {
    /// Add a dependency: predecessor -> successor.
    Add {
        predecessor: u64,
        successor: u64,
        #[arg(long, value_enum, default_value_t = DependencyType::FinishToStart)]
        kind: DependencyType,
        /// Lag in days, may be negative.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        lag: i64,
    },
    /// List dependencies, optionally only those touching one task.
    List {
        #[arg(long)]
        task: Option<u64>,
    },
    /// Remove a dependency by id.
    Rm { id: u64 },
}

#[derive(Subcommand)]
pub enum GanttAction {
    /// Print the chart as text.
    List {
        #[arg(long)]
        project: Option<u64>,
        #[arg(long, value_enum, default_value_t = ViewMode::Weeks)]
        mode: ViewMode,
    },
    /// Critical tasks and the longest dependency chain.
    Critical {
        #[arg(long)]
        project: Option<u64>,
    },
    /// Grid diagnostics, filtered by the saved overlay preferences.
    Debug {
        #[arg(long)]
        project: Option<u64>,
        #[arg(long, value_enum, default_value_t = ViewMode::Days)]
        mode: ViewMode,
    },
    /// Render the chart to an SVG file.
    Svg {
        #[arg(long)]
        project: Option<u64>,
        #[arg(long, value_enum, default_value_t = ViewMode::Days)]
        mode: ViewMode,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum MemberAction {
    /// Add a team member.
    Add {
        name: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long = "skill")]
        skills: Vec<String>,
        /// Weekly capacity in hours (default from SP_WEEKLY_CAPACITY).
        #[arg(long)]
        capacity: Option<f64>,
    },
    /// List the crew with this week's load.
    List,
}

#[derive(Subcommand)]
pub enum AllocAction {
    /// Allocate hours for a member on a project in the week containing a date.
    Add {
        member: u64,
        project: u64,
        week: String,
        hours: f64,
    },
    /// Weekly utilization per member.
    List {
        /// Only over-allocated weeks.
        #[arg(long)]
        over: bool,
    },
    /// Remove an allocation.
    Rm { id: u64 },
}

#[derive(Subcommand)]
pub enum EquipmentAction {
    /// Register equipment.
    Add {
        name: String,
        equipment_type: String,
        #[arg(long, value_enum, default_value_t = EquipmentStatus::Available)]
        status: EquipmentStatus,
        #[arg(long)]
        project: Option<u64>,
        #[arg(long = "operator")]
        operators: Vec<String>,
        #[arg(long)]
        maintenance_due: Option<String>,
        /// Days between services.
        #[arg(long)]
        interval: Option<i64>,
    },
    /// List equipment.
    List,
    /// Change equipment status.
    Status {
        id: u64,
        #[arg(value_enum)]
        status: EquipmentStatus,
    },
    /// Book equipment for a project over a date range.
    Book {
        id: u64,
        project: u64,
        start: String,
        end: String,
    },
    /// Schedule a maintenance visit.
    Maintain {
        id: u64,
        date: String,
        description: String,
    },
    /// Complete a maintenance record.
    Complete {
        record: u64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Maintenance overdue or due within the horizon.
    Due,
}

#[derive(Subcommand)]
pub enum ConflictAction {
    /// List detected conflicts.
    List,
    /// Show fixes for a conflict, or apply one.
    Resolve {
        /// Conflict number from `conflicts list`.
        index: usize,
        /// Fix number; omit to list the options.
        choice: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum StakeholderAction {
    /// Add a stakeholder.
    Add {
        company: String,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long = "type", value_enum, default_value_t = StakeholderType::Subcontractor)]
        stakeholder_type: StakeholderType,
        #[arg(long, value_enum, default_value_t = StakeholderStatus::Active)]
        status: StakeholderStatus,
        #[arg(long = "specialty")]
        specialties: Vec<String>,
        /// Put the stakeholder on the lead pipeline at this stage.
        #[arg(long, value_enum)]
        stage: Option<LeadStatus>,
        /// Lead score 0-100.
        #[arg(long)]
        score: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Directory listing.
    List {
        #[arg(long = "type", value_enum)]
        stakeholder_type: Option<StakeholderType>,
        #[arg(long, value_enum)]
        status: Option<StakeholderStatus>,
        #[arg(long)]
        specialty: Option<String>,
        /// Match company, contact or specialty.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = StakeholderSort::Name)]
        sort: StakeholderSort,
        /// Layout; defaults to the saved preference.
        #[arg(long, value_enum)]
        view: Option<StakeholderView>,
    },
    /// Full record with assignments, contact history and ratings.
    View { id: u64 },
    /// Change stakeholder fields.
    Update {
        id: u64,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long = "type", value_enum)]
        stakeholder_type: Option<StakeholderType>,
        #[arg(long, value_enum)]
        status: Option<StakeholderStatus>,
        /// Replaces the specialty list.
        #[arg(long = "specialty")]
        specialties: Vec<String>,
        #[arg(long)]
        score: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Set the pipeline stage directly.
    Stage {
        id: u64,
        #[arg(value_enum)]
        stage: LeadStatus,
    },
    /// Move a lead one stage forward or back.
    Move {
        id: u64,
        #[arg(value_enum)]
        direction: Direction,
    },
    /// Assign to a project (and optionally a task).
    Assign {
        id: u64,
        project: u64,
        role: String,
        #[arg(long)]
        task: Option<u64>,
        #[arg(long, default_value = "today")]
        start: String,
        #[arg(long)]
        end: Option<String>,
    },
    /// Close an active assignment.
    Close {
        assignment: u64,
        /// Mark cancelled instead of completed.
        #[arg(long)]
        cancel: bool,
    },
    /// Record a performance rating (scores 1-5).
    Rate {
        id: u64,
        quality: u8,
        timeliness: u8,
        communication: u8,
        safety: u8,
        #[arg(long)]
        project: Option<u64>,
        #[arg(long)]
        comments: Option<String>,
        #[arg(long, default_value = "today")]
        date: String,
    },
    /// Pipeline counts per stage and conversion rate.
    Summary,
}

#[derive(Subcommand)]
pub enum InteractionAction {
    /// Log a contact.
    Log {
        stakeholder: u64,
        #[arg(value_enum)]
        kind: InteractionType,
        #[arg(long, default_value = "today")]
        date: String,
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
        /// Schedule a follow-up.
        #[arg(long)]
        follow_up: Option<String>,
    },
    /// Contact history for a stakeholder, newest first.
    List { stakeholder: u64 },
    /// Open follow-ups due within N days (overdue included).
    Due {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Mark a follow-up done.
    Done { id: u64 },
}

/// Parts of the Gantt debug overlay.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OverlayPart {
    Timeline,
    Positions,
    Sources,
    Anomalies,
}

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Print the saved preferences.
    Show,
    /// Turn the Gantt debug overlay on or off.
    Debug {
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },
    /// Show or hide one part of the debug overlay.
    Overlay {
        #[arg(value_enum)]
        part: OverlayPart,
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        visible: bool,
    },
    /// Default stakeholder layout.
    View {
        #[arg(value_enum)]
        view: StakeholderView,
    },
}

/// Where the current invocation reads and writes.
pub struct Context {
    pub db_path: PathBuf,
    pub config: Config,
    pub today: NaiveDate,
}

impl Context {
    pub fn workspace(&self) -> AppResult<Workspace<JsonFileRepository>> {
        Ok(Workspace::open(JsonFileRepository::new(&self.db_path), self.today)?
            .with_weekly_capacity(self.config.weekly_capacity_hours)
            .with_maintenance_horizon(self.config.maintenance_horizon_days))
    }

    pub fn preferences(&self) -> PreferenceStore {
        PreferenceStore::new(preferences_path_for(&self.db_path))
    }

    fn date(&self, field: &str, input: &str) -> AppResult<NaiveDate> {
        require_date(field, input, self.today)
    }

    fn opt_date(&self, field: &str, input: Option<String>) -> AppResult<Option<NaiveDate>> {
        input.map(|s| self.date(field, &s)).transpose()
    }
}

/// Dispatch one parsed command.
pub fn run(command: Commands, ctx: &Context) -> AppResult<()> {
    match command {
        Commands::Ui => run_gantt(ctx.workspace()?, ctx.preferences(), ctx.config.debounce()),
        Commands::Pipeline => run_pipeline(ctx.workspace()?),
        Commands::Project { action } => cmd_project(ctx, action),
        Commands::Task { action } => cmd_task(ctx, action),
        Commands::Dep { action } => cmd_dep(ctx, action),
        Commands::Gantt { action } => cmd_gantt(ctx, action),
        Commands::Member { action } => cmd_member(ctx, action),
        Commands::Alloc { action } => cmd_alloc(ctx, action),
        Commands::Equipment { action } => cmd_equipment(ctx, action),
        Commands::Conflicts { action } => cmd_conflicts(ctx, action),
        Commands::Stakeholder { action } => cmd_stakeholder(ctx, action),
        Commands::Interaction { action } => cmd_interaction(ctx, action),
        Commands::Prefs { action } => cmd_prefs(ctx, action),
        Commands::Export { output, all, project } => cmd_export(ctx, output, all, project),
        Commands::Backup => cmd_backup(ctx),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

fn cmd_project(ctx: &Context, action: ProjectAction) -> AppResult<()> {
    let mut ws = ctx.workspace()?;
    match action {
        ProjectAction::Add { name, location, start, end } => {
            let id = ws.create_project(ProjectDraft {
                name,
                location,
                start_date: ctx.opt_date("start", start)?,
                end_date: ctx.opt_date("end", end)?,
            })?;
            println!("Added project {id}");
        }
        ProjectAction::List => {
            let db = ws.db();
            println!("{:<5} {:<28} {:<20} {:<11} {:<11} {}", "ID", "Name", "Location", "Start", "End", "Tasks");
            for p in &db.projects {
                println!(
                    "{:<5} {:<28} {:<20} {:<11} {:<11} {}",
                    p.id,
                    truncate(&p.name, 28),
                    truncate(p.location.as_deref().unwrap_or("-"), 20),
                    format_date(p.start_date),
                    format_date(p.end_date),
                    db.tasks_in(Some(p.id)).len()
                );
            }
        }
    }
    Ok(())
}

fn cmd_task(ctx: &Context, action: TaskAction) -> AppResult<()> {
    let mut ws = ctx.workspace()?;
    match action {
        TaskAction::Add {
            title, project, status, priority, category, start, due, hours, progress, assignees, skills,
        } => {
            let id = ws.create_task(TaskDraft {
                project_id: project,
                title,
                status,
                priority,
                category,
                start_date: ctx.opt_date("start", start)?,
                due_date: ctx.opt_date("due", due)?,
                estimated_hours: hours,
                progress,
                assignees: parse_id_list(&assignees)?,
                required_skills: skills,
            })?;
            println!("Added task {id}");
        }
        TaskAction::List { project, all, status, sort, limit } => {
            let mut tasks: Vec<&Task> = ws
                .db()
                .tasks_in(project)
                .into_iter()
                .filter(|t| all || !t.is_completed())
                .filter(|t| status.map_or(true, |s| t.status == s))
                .collect();
            match sort {
                SortKey::Start => tasks.sort_by_key(|t| (t.start_date.unwrap_or(NaiveDate::MAX), t.id)),
                SortKey::Due => tasks.sort_by_key(|t| (t.due_date.unwrap_or(NaiveDate::MAX), t.id)),
                SortKey::Priority => tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id))),
                SortKey::Id => tasks.sort_by_key(|t| t.id),
            }
            if let Some(n) = limit {
                tasks.truncate(n);
            }
            print_task_table(&tasks, ws.today());
        }
        TaskAction::View { id } => {
            let db = ws.db();
            let task = db.require_task(id)?;
            let project = task.project_id.and_then(|p| db.project(p)).map(|p| p.name.as_str());
            let names: Vec<String> = task
                .assignees
                .iter()
                .map(|m| db.member(*m).map_or_else(|| format!("#{m}"), |m| m.name.clone()))
                .collect();
            println!("Task #{}: {}", task.id, task.title);
            println!("Project:     {}", project.unwrap_or("-"));
            println!("Status:      {}", task.status.label());
            println!("Priority:    {}", task.priority.label());
            println!("Category:    {}", task.category.as_deref().unwrap_or("-"));
            println!("Start:       {}", format_date(task.start_date));
            println!("Due:         {} ({})", format_date(task.due_date), format_relative(task.due_date, ws.today()));
            println!("Estimate:    {}", task.estimated_hours.map_or("-".to_string(), |h| format!("{h}h")));
            println!("Progress:    {}%", task.progress);
            println!("Assignees:   {}", if names.is_empty() { "-".to_string() } else { names.join(", ") });
            println!("Skills:      {}", if task.required_skills.is_empty() { "-".to_string() } else { task.required_skills.join(", ") });
            for dep in db.dependencies.iter().filter(|d| d.predecessor_id == id || d.successor_id == id) {
                println!(
                    "Dependency:  [{}] #{} -> #{} {} lag {}d",
                    dep.id,
                    dep.predecessor_id,
                    dep.successor_id,
                    dep.dependency_type.label(),
                    dep.lag_days
                );
            }
        }
        TaskAction::Update {
            id, title, project, status, priority, category, start, due, clear_start, clear_due, hours, progress,
            assignees, skills,
        } => {
            ws.update_task(
                id,
                TaskPatch {
                    title,
                    project_id: project,
                    status,
                    priority,
                    category,
                    start_date: ctx.opt_date("start", start)?,
                    due_date: ctx.opt_date("due", due)?,
                    clear_start,
                    clear_due,
                    estimated_hours: hours,
                    progress,
                    assignees: if assignees.is_empty() { None } else { Some(parse_id_list(&assignees)?) },
                    required_skills: if skills.is_empty() { None } else { Some(skills) },
                },
            )?;
            println!("Updated task {id}");
        }
        TaskAction::Move { id, date, until, dry_run } => {
            let proposed = parse_date_input(&date, ws.today());
            let project = ws.db().require_task(id)?.project_id;
            let mut range = range_for_tasks(ws.db().tasks_in(project), ws.today(), CHART_PADDING_DAYS);
            if let Some(end) = ctx.opt_date("until", until)? {
                range.1 = end;
            }
            let validation = if dry_run {
                ws.preview_move(id, proposed, range)?
            } else {
                ws.move_task(id, proposed, range)?
            };
            for msg in &validation.messages {
                println!("{}: {msg}", validation.validity.label());
            }
            if dry_run {
                println!("Move would be {}", validation.validity.label());
            } else {
                let task = ws.db().require_task(id)?;
                println!(
                    "Moved task {id} to {}..{}",
                    format_date(task.start_date),
                    format_date(task.due_date)
                );
            }
        }
        TaskAction::Complete { id } => {
            ws.update_task(id, TaskPatch { status: Some(TaskStatus::Completed), ..Default::default() })?;
            println!("Completed task {id}");
        }
    }
    Ok(())
}

fn print_task_table(tasks: &[&Task], today: NaiveDate) {
    println!(
        "{:<5} {:<32} {:<12} {:<9} {:<11} {:<11} {:<10} {}",
        "ID", "Title", "Status", "Priority", "Start", "Due", "Due in", "Progress"
    );
    for t in tasks {
        let marker = if t.is_milestone() { "◆ " } else { "" };
        println!(
            "{:<5} {:<32} {:<12} {:<9} {:<11} {:<11} {:<10} {}%",
            t.id,
            truncate(&format!("{marker}{}", t.title), 32),
            t.status.label(),
            t.priority.label(),
            format_date(t.start_date),
            format_date(t.due_date),
            format_relative(t.due_date, today),
            t.progress
        );
    }
}

fn cmd_dep(ctx: &Context, action: DepAction) -> AppResult<()> {
    let mut ws = ctx.workspace()?;
    match action {
        DepAction::Add { predecessor, successor, kind, lag } => {
            let id = ws.add_dependency(predecessor, successor, kind, lag)?;
            println!("Added dependency {id}: #{predecessor} -> #{successor}");
        }
        DepAction::List { task } => {
            let db = ws.db();
            println!("{:<5} {:<28} {:<28} {:<17} {}", "ID", "Predecessor", "Successor", "Type", "Lag");
            let title = |id: u64| db.task(id).map_or_else(|| format!("#{id}"), |t| format!("#{id} {}", t.title));
            for d in db
                .dependencies
                .iter()
                .filter(|d| task.map_or(true, |t| d.predecessor_id == t || d.successor_id == t))
            {
                println!(
                    "{:<5} {:<28} {:<28} {:<17} {}d",
                    d.id,
                    truncate(&title(d.predecessor_id), 28),
                    truncate(&title(d.successor_id), 28),
                    d.dependency_type.label(),
                    d.lag_days
                );
            }
        }
        DepAction::Rm { id } => {
            ws.remove_dependency(id)?;
            println!("Removed dependency {id}");
        }
    }
    Ok(())
}

/// Tasks on the chart for a project (or everything), in start order.
fn chart_tasks(db: &Database, project: Option<u64>) -> Vec<Task> {
    let mut tasks: Vec<Task> = db.tasks_in(project).into_iter().cloned().collect();
    tasks.sort_by_key(|t| (t.start_date.or(t.due_date).unwrap_or(NaiveDate::MAX), t.id));
    tasks
}

fn chart_timeline(tasks: &[Task], today: NaiveDate, mode: ViewMode) -> Timeline {
    let (start, end) = range_for_tasks(tasks, today, CHART_PADDING_DAYS);
    Timeline::new(start, end, mode)
}

fn cmd_gantt(ctx: &Context, action: GanttAction) -> AppResult<()> {
    let ws = ctx.workspace()?;
    let db = ws.db();
    let today = ws.today();
    match action {
        GanttAction::List { project, mode } => {
            let tasks = chart_tasks(db, project);
            let timeline = chart_timeline(&tasks, today, mode);
            let critical = critical_tasks(&tasks, &db.dependencies, today);
            let today_col = timeline.today_column(today);
            println!(
                "{} view, {}..{} ({} columns)",
                mode.label(),
                timeline.start,
                timeline.end,
                timeline.len()
            );
            for task in &tasks {
                let pos = task_grid_position(task, &timeline, today);
                let fill = if task.is_milestone() {
                    '◆'
                } else if critical.contains_key(&task.id) {
                    '▓'
                } else {
                    '█'
                };
                let bar: String = (0..timeline.len())
                    .map(|col| {
                        if col >= pos.start_column && col < pos.start_column + pos.span {
                            fill
                        } else if Some(col) == today_col {
                            '|'
                        } else {
                            '·'
                        }
                    })
                    .collect();
                println!("{:<5} {:<28} {}", task.id, truncate(&task.title, 28), bar);
            }
        }
        GanttAction::Critical { project } => {
            let tasks = chart_tasks(db, project);
            let critical = critical_tasks(&tasks, &db.dependencies, today);
            if critical.is_empty() {
                println!("No critical tasks");
            }
            for (id, reasons) in &critical {
                let title = db.task(*id).map(|t| t.title.as_str()).unwrap_or("-");
                let reasons: Vec<&str> = reasons.iter().map(|r| r.label()).collect();
                println!("{:<5} {:<32} {}", id, truncate(title, 32), reasons.join(", "));
            }
            let chain = longest_chain(&tasks, &db.dependencies, today);
            if !chain.is_empty() {
                let ids: Vec<String> = chain.iter().map(|id| format!("#{id}")).collect();
                println!("Longest chain: {}", ids.join(" -> "));
            }
        }
        GanttAction::Debug { project, mode } => {
            let tasks = chart_tasks(db, project);
            let timeline = chart_timeline(&tasks, today, mode);
            let prefs = ctx.preferences().load();
            for line in diagnostics(&tasks, &timeline, today).lines(&prefs.gantt_debug_preferences) {
                println!("{line}");
            }
        }
        GanttAction::Svg { project, mode, output } => {
            let tasks = chart_tasks(db, project);
            let timeline = chart_timeline(&tasks, today, mode);
            let critical = critical_tasks(&tasks, &db.dependencies, today);
            let svg = render_svg(&tasks, &db.dependencies, &timeline, &critical, today, SvgOptions::for_mode(mode));
            let output = output.unwrap_or_else(|| PathBuf::from("gantt.svg"));
            fs::write(&output, svg)?;
            println!("Wrote {} task(s) to {}", tasks.len(), output.display());
        }
    }
    Ok(())
}

fn cmd_member(ctx: &Context, action: MemberAction) -> AppResult<()> {
    let mut ws = ctx.workspace()?;
    match action {
        MemberAction::Add { name, role, skills, capacity } => {
            let id = ws.add_member(MemberDraft { name, role, skills, weekly_capacity_hours: capacity })?;
            println!("Added team member {id}");
        }
        MemberAction::List => {
            let loads = ws.utilization();
            let this_week = week_start(ws.today());
            println!("{:<5} {:<22} {:<16} {:<28} {:<9} {}", "ID", "Name", "Role", "Skills", "Capacity", "This week");
            for m in &ws.db().team_members {
                let load = loads
                    .iter()
                    .find(|l| l.member_id == m.id && l.week_start == this_week)
                    .map_or(0.0, |l| l.hours);
                println!(
                    "{:<5} {:<22} {:<16} {:<28} {:<9} {:.1}h",
                    m.id,
                    truncate(&m.name, 22),
                    truncate(m.role.as_deref().unwrap_or("-"), 16),
                    truncate(&m.skills.join(","), 28),
                    format!("{}h", m.weekly_capacity_hours),
                    load
                );
            }
        }
    }
    Ok(())
}

fn cmd_alloc(ctx: &Context, action: AllocAction) -> AppResult<()> {
    let mut ws = ctx.workspace()?;
    match action {
        AllocAction::Add { member, project, week, hours } => {
            let week = ctx.date("week", &week)?;
            let id = ws.allocate(AllocationDraft { project_id: project, team_member_id: member, week, hours })?;
            println!("Saved allocation {id}");
            if let Some(load) = ws
                .utilization()
                .into_iter()
                .find(|l| l.member_id == member && l.week_start == week_start(week))
                .filter(|l| l.is_over_allocated())
            {
                println!(
                    "Warning: member {member} is at {:.0}% ({:.1}h of {:.1}h) that week",
                    load.percent(),
                    load.hours,
                    load.capacity
                );
            }
        }
        AllocAction::List { over } => {
            let db = ws.db();
            println!("{:<22} {:<11} {:>8} {:>9} {:>6}  {}", "Member", "Week", "Hours", "Capacity", "Load", "Projects");
            for load in ws.utilization().iter().filter(|l| !over || l.is_over_allocated()) {
                let name = db.member(load.member_id).map_or("-", |m| m.name.as_str());
                let flag = if load.is_critical() {
                    " !!"
                } else if load.is_over_allocated() {
                    " !"
                } else {
                    ""
                };
                let projects: Vec<String> = load
                    .by_project
                    .iter()
                    .map(|(p, h)| {
                        let name = db.project(*p).map_or_else(|| format!("#{p}"), |p| p.name.clone());
                        format!("{name} {h:.1}h")
                    })
                    .collect();
                println!(
                    "{:<22} {:<11} {:>8.1} {:>9.1} {:>5.0}%{}  {}",
                    truncate(name, 22),
                    load.week_start,
                    load.hours,
                    load.capacity,
                    load.percent(),
                    flag,
                    projects.join(", ")
                );
            }
        }
        AllocAction::Rm { id } => {
            ws.remove_allocation(id)?;
            println!("Removed allocation {id}");
        }
    }
    Ok(())
}

fn cmd_equipment(ctx: &Context, action: EquipmentAction) -> AppResult<()> {
    let mut ws = ctx.workspace()?;
    match action {
        EquipmentAction::Add { name, equipment_type, status, project, operators, maintenance_due, interval } => {
            let id = ws.add_equipment(EquipmentDraft {
                name,
                equipment_type,
                status,
                project_id: project,
                operators: parse_id_list(&operators)?,
                maintenance_due: ctx.opt_date("maintenance due", maintenance_due)?,
                maintenance_interval_days: interval,
            })?;
            println!("Added equipment {id}");
        }
        EquipmentAction::List => {
            let db = ws.db();
            println!("{:<5} {:<22} {:<16} {:<15} {:<20} {}", "ID", "Name", "Type", "Status", "Project", "Service due");
            for e in &db.equipment {
                let project = e.project_id.and_then(|p| db.project(p)).map_or("-", |p| p.name.as_str());
                println!(
                    "{:<5} {:<22} {:<16} {:<15} {:<20} {}",
                    e.id,
                    truncate(&e.name, 22),
                    truncate(&e.equipment_type, 16),
                    e.status.label(),
                    truncate(project, 20),
                    format_relative(e.maintenance_due, ws.today())
                );
            }
        }
        EquipmentAction::Status { id, status } => {
            ws.set_equipment_status(id, status)?;
            println!("Equipment {id} is now {}", status.label());
        }
        EquipmentAction::Book { id, project, start, end } => {
            let booking = ws.book_equipment(id, project, ctx.date("start", &start)?, ctx.date("end", &end)?)?;
            println!("Added booking {booking}");
        }
        EquipmentAction::Maintain { id, date, description } => {
            let record = ws.schedule_maintenance(id, ctx.date("date", &date)?, &description)?;
            println!("Scheduled maintenance {record}");
        }
        EquipmentAction::Complete { record, date } => {
            let date = ctx.opt_date("date", date)?.unwrap_or(ws.today());
            ws.complete_maintenance(record, date)?;
            println!("Completed maintenance {record}");
        }
        EquipmentAction::Due => {
            let due = ws.maintenance_due();
            if due.is_empty() {
                println!("Nothing due in the next {} days", ws.maintenance_horizon_days());
            }
            for item in due {
                let when = if item.is_overdue() {
                    format!("{}d overdue", item.days_overdue)
                } else {
                    format_relative(Some(item.due), ws.today())
                };
                println!("{:<5} {:<24} {:<11} {}", item.equipment_id, truncate(&item.name, 24), item.due, when);
            }
        }
    }
    Ok(())
}

fn cmd_conflicts(ctx: &Context, action: ConflictAction) -> AppResult<()> {
    let mut ws = ctx.workspace()?;
    match action {
        ConflictAction::List => {
            let conflicts = ws.conflicts();
            if conflicts.is_empty() {
                println!("No conflicts");
            }
            for (i, c) in conflicts.iter().enumerate() {
                println!("{:<3} {:<9} {:<22} {}", i + 1, c.severity.label(), c.kind.label(), c.description);
            }
        }
        ConflictAction::Resolve { index, choice } => {
            let index = index
                .checked_sub(1)
                .ok_or_else(|| AppError::invalid("conflict numbers start at 1"))?;
            match choice {
                None => {
                    let conflicts = ws.conflicts();
                    let conflict = conflicts
                        .get(index)
                        .ok_or_else(|| AppError::invalid(format!("no conflict {}", index + 1)))?;
                    println!("{}", conflict.description);
                    let fixes = ws.resolutions_for(conflict);
                    if fixes.is_empty() {
                        println!("No automatic fix; resolve it by hand");
                    }
                    for (i, fix) in fixes.iter().enumerate() {
                        println!("  {}. {}", i + 1, fix.describe(ws.db()));
                    }
                }
                Some(choice) => {
                    let choice = choice
                        .checked_sub(1)
                        .ok_or_else(|| AppError::invalid("fix numbers start at 1"))?;
                    let applied = ws.resolve_conflict(index, choice)?;
                    println!("Applied: {}", applied.describe(ws.db()));
                }
            }
        }
    }
    Ok(())
}

fn cmd_stakeholder(ctx: &Context, action: StakeholderAction) -> AppResult<()> {
    let mut ws = ctx.workspace()?;
    match action {
        StakeholderAction::Add {
            company, contact, email, phone, stakeholder_type, status, specialties, stage, score, notes,
        } => {
            let id = ws.add_stakeholder(StakeholderDraft {
                company_name: company,
                contact_person: contact,
                email,
                phone,
                stakeholder_type,
                status,
                specialties,
                lead_status: stage,
                lead_score: score,
                notes,
            })?;
            println!("Added stakeholder {id}");
        }
        StakeholderAction::List { stakeholder_type, status, specialty, search, sort, view } => {
            let filter = StakeholderFilter { stakeholder_type, status, specialty, text: search };
            let mut list = filter_stakeholders(&ws.db().stakeholders, &filter);
            sort_stakeholders(&mut list, sort);
            match view.unwrap_or_else(|| ctx.preferences().load().stakeholder_view) {
                StakeholderView::Table => print_stakeholder_table(&list),
                StakeholderView::Cards => print_stakeholder_cards(&list),
                StakeholderView::Pipeline => {
                    let owned: Vec<Stakeholder> = list.into_iter().cloned().collect();
                    print_pipeline(&owned);
                }
            }
        }
        StakeholderAction::View { id } => print_stakeholder_detail(&ws, id)?,
        StakeholderAction::Update {
            id, company, contact, email, phone, stakeholder_type, status, specialties, score, notes,
        } => {
            ws.update_stakeholder(
                id,
                StakeholderPatch {
                    company_name: company,
                    contact_person: contact,
                    email,
                    phone,
                    stakeholder_type,
                    status,
                    specialties: if specialties.is_empty() { None } else { Some(specialties) },
                    lead_score: score,
                    notes,
                },
            )?;
            println!("Updated stakeholder {id}");
        }
        StakeholderAction::Stage { id, stage } => {
            ws.set_lead_stage(id, stage)?;
            println!("Stakeholder {id} is now {}", stage.label());
        }
        StakeholderAction::Move { id, direction } => {
            let stage = ws.move_lead(id, direction)?;
            println!("Stakeholder {id} moved to {}", stage.label());
        }
        StakeholderAction::Assign { id, project, role, task, start, end } => {
            let assignment = ws.assign_stakeholder(AssignmentDraft {
                stakeholder_id: id,
                project_id: project,
                task_id: task,
                role,
                start_date: ctx.date("start", &start)?,
                end_date: ctx.opt_date("end", end)?,
            })?;
            println!("Added assignment {assignment}");
        }
        StakeholderAction::Close { assignment, cancel } => {
            if cancel {
                ws.close_assignment(assignment, AssignmentStatus::Cancelled)?;
                println!("Cancelled assignment {assignment}");
            } else {
                ws.complete_assignment(assignment)?;
                println!("Completed assignment {assignment}");
            }
        }
        StakeholderAction::Rate { id, quality, timeliness, communication, safety, project, comments, date } => {
            let rating = ws.rate_stakeholder(RatingDraft {
                stakeholder_id: id,
                project_id: project,
                quality,
                timeliness,
                communication,
                safety,
                comments,
                rated_on: ctx.date("date", &date)?,
            })?;
            println!("Stakeholder {id} rating is now {rating:.1}");
        }
        StakeholderAction::Summary => {
            let summary = pipeline_summary(&ws.db().stakeholders);
            println!("{:<12} {:>6} {:>10}", "Stage", "Leads", "Avg score");
            for stage in &summary.stages {
                println!(
                    "{:<12} {:>6} {:>10}",
                    stage.stage.label(),
                    stage.count,
                    stage.average_score.map_or("-".to_string(), |s| format!("{s:.0}"))
                );
            }
            match summary.conversion_rate {
                Some(rate) => println!("Conversion: {:.0}%", rate * 100.0),
                None => println!("Conversion: -"),
            }
        }
    }
    Ok(())
}

fn print_stakeholder_table(list: &[&Stakeholder]) {
    println!(
        "{:<5} {:<26} {:<20} {:<14} {:<10} {:<7} {:<12} {}",
        "ID", "Company", "Contact", "Type", "Status", "Rating", "Stage", "Score"
    );
    for s in list {
        println!(
            "{:<5} {:<26} {:<20} {:<14} {:<10} {:<7} {:<12} {}",
            s.id,
            truncate(&s.company_name, 26),
            truncate(s.contact_person.as_deref().unwrap_or("-"), 20),
            s.stakeholder_type.label(),
            s.status.label(),
            s.rating.map_or("-".to_string(), |r| format!("{r:.1}")),
            s.lead_status.map_or("-", |l| l.label()),
            s.lead_score.map_or("-".to_string(), |v| v.to_string())
        );
    }
}

fn print_stakeholder_cards(list: &[&Stakeholder]) {
    for s in list {
        println!("┌ #{} {} ({})", s.id, s.company_name, s.stakeholder_type.label());
        println!("│ {} · {}", s.contact_person.as_deref().unwrap_or("-"), s.status.label());
        println!(
            "│ {} · {}",
            s.email.as_deref().unwrap_or("-"),
            s.phone.as_deref().unwrap_or("-")
        );
        if !s.specialties.is_empty() {
            println!("│ {}", s.specialties.join(", "));
        }
        println!("└ rating {}", s.rating.map_or("-".to_string(), |r| format!("{r:.1}")));
    }
}

fn print_pipeline(stakeholders: &[Stakeholder]) {
    for stage in LeadStatus::ALL {
        let leads = leads_in_stage(stakeholders, stage);
        println!("{} ({})", stage.label(), leads.len());
        for s in leads {
            println!(
                "  #{:<4} {:<26} {}",
                s.id,
                truncate(&s.company_name, 26),
                s.lead_score.map_or("-".to_string(), |v| v.to_string())
            );
        }
    }
}

fn print_stakeholder_detail(ws: &Workspace<JsonFileRepository>, id: u64) -> AppResult<()> {
    let db = ws.db();
    let s = db.require_stakeholder(id)?;
    println!("Stakeholder #{}: {}", s.id, s.company_name);
    println!("Contact:     {}", s.contact_person.as_deref().unwrap_or("-"));
    println!("Email:       {}", s.email.as_deref().unwrap_or("-"));
    println!("Phone:       {}", s.phone.as_deref().unwrap_or("-"));
    println!("Type:        {}", s.stakeholder_type.label());
    println!("Status:      {}", s.status.label());
    println!("Specialties: {}", if s.specialties.is_empty() { "-".to_string() } else { s.specialties.join(", ") });
    println!("Rating:      {}", s.rating.map_or("-".to_string(), |r| format!("{r:.1}")));
    println!(
        "Lead:        {} (score {})",
        s.lead_status.map_or("-", |l| l.label()),
        s.lead_score.map_or("-".to_string(), |v| v.to_string())
    );
    if let Some(notes) = &s.notes {
        println!("Notes:       {notes}");
    }

    let assignments = ws.assignments_for(Some(id), None);
    if !assignments.is_empty() {
        println!();
        println!("Assignments:");
        for a in assignments {
            let project = db.project(a.project_id).map_or("-", |p| p.name.as_str());
            println!(
                "  [{}] {} on {}{} {}..{} {}",
                a.id,
                a.role,
                project,
                a.task_id.map_or(String::new(), |t| format!(" task #{t}")),
                a.start_date,
                format_date(a.end_date),
                a.status.label()
            );
        }
    }

    let history = interaction_timeline(&db.interactions, id);
    if !history.is_empty() {
        println!();
        println!("Contact history:");
        for i in history {
            let follow_up = match (i.follow_up_date, i.follow_up_done) {
                (Some(_), true) => " (follow-up done)".to_string(),
                (Some(d), false) => format!(" (follow up {})", format_relative(Some(d), ws.today())),
                (None, _) => String::new(),
            };
            println!(
                "  [{}] {} {} {}{}",
                i.id,
                i.date,
                i.interaction_type.label(),
                i.notes.as_deref().unwrap_or(""),
                follow_up
            );
        }
    }

    let ratings: Vec<_> = db.ratings.iter().filter(|r| r.stakeholder_id == id).collect();
    if !ratings.is_empty() {
        println!();
        println!("Ratings:");
        for r in ratings {
            println!(
                "  {} overall {:.2} (quality {}, timeliness {}, communication {}, safety {}) {}",
                r.rated_on,
                overall_score(r),
                r.quality,
                r.timeliness,
                r.communication,
                r.safety,
                r.comments.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

fn cmd_interaction(ctx: &Context, action: InteractionAction) -> AppResult<()> {
    let mut ws = ctx.workspace()?;
    match action {
        InteractionAction::Log { stakeholder, kind, date, minutes, notes, follow_up } => {
            let id = ws.log_interaction(InteractionDraft {
                stakeholder_id: stakeholder,
                interaction_type: kind,
                date: ctx.date("date", &date)?,
                duration_minutes: minutes,
                notes,
                follow_up_date: ctx.opt_date("follow-up", follow_up)?,
            })?;
            println!("Logged interaction {id}");
        }
        InteractionAction::List { stakeholder } => {
            ws.db().require_stakeholder(stakeholder)?;
            for i in interaction_timeline(&ws.db().interactions, stakeholder) {
                println!(
                    "{:<5} {:<11} {:<11} {:>5} {}",
                    i.id,
                    i.date,
                    i.interaction_type.label(),
                    i.duration_minutes.map_or("-".to_string(), |m| format!("{m}m")),
                    i.notes.as_deref().unwrap_or("")
                );
            }
        }
        InteractionAction::Due { days } => {
            let db = ws.db();
            for i in pending_follow_ups(&db.interactions, ws.today(), days) {
                let who = db.stakeholder(i.stakeholder_id).map_or("-", |s| s.company_name.as_str());
                println!(
                    "{:<5} {:<26} {:<11} {}",
                    i.id,
                    truncate(who, 26),
                    i.interaction_type.label(),
                    format_relative(i.follow_up_date, ws.today())
                );
            }
        }
        InteractionAction::Done { id } => {
            ws.complete_follow_up(id)?;
            println!("Follow-up {id} done");
        }
    }
    Ok(())
}

fn cmd_prefs(ctx: &Context, action: PrefsAction) -> AppResult<()> {
    let store = ctx.preferences();
    let prefs = match action {
        PrefsAction::Show => store.load(),
        PrefsAction::Debug { enabled } => store.update(|p| p.gantt_debug_mode = enabled)?,
        PrefsAction::Overlay { part, visible } => store.update(|p| {
            let overlay = &mut p.gantt_debug_preferences;
            match part {
                OverlayPart::Timeline => overlay.show_timeline = visible,
                OverlayPart::Positions => overlay.show_task_positions = visible,
                OverlayPart::Sources => overlay.show_date_sources = visible,
                OverlayPart::Anomalies => overlay.show_anomalies = visible,
            }
        })?,
        PrefsAction::View { view } => store.update(|p| p.stakeholder_view = view)?,
    };
    println!("{}", serde_json::to_string_pretty(&prefs)?);
    Ok(())
}

fn cmd_export(ctx: &Context, output: Option<PathBuf>, all: bool, project: Option<u64>) -> AppResult<()> {
    let ws = ctx.workspace()?;
    let output = output.unwrap_or_else(|| PathBuf::from("tasks.csv"));
    let count = write_tasks_csv(ws.db(), TaskExportFilter { project_id: project, include_completed: all }, &output)?;
    println!("Exported {count} task(s) to {}", output.display());
    Ok(())
}

fn cmd_backup(ctx: &Context) -> AppResult<()> {
    let path = create_backup(&ctx.db_path)?;
    println!("Backup created: {}", path.display());
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::{CommandFactory, Parser};

    fn context(dir: &std::path::Path) -> Context {
        Context {
            db_path: dir.join("workspace.json"),
            config: Config::from_lookup(|_| None),
            today: NaiveDate::from_ymd_opt(2024, 3, 13).unwrap(),
        }
    }

    fn exec(ctx: &Context, args: &[&str]) -> AppResult<()> {
        let mut argv = vec!["sp"];
        argv.extend_from_slice(args);
        run(Cli::parse_from(argv).command, ctx)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn schedule_through_the_cli() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        exec(&ctx, &["project", "add", "Harbour Apartments"]).unwrap();
        exec(&ctx, &["task", "add", "Excavate", "--project", "1", "--start", "2024-03-11", "--due", "2024-03-15"]).unwrap();
        exec(&ctx, &["task", "add", "Footings", "--project", "1", "--start", "2024-03-18", "--hours", "24"]).unwrap();
        exec(&ctx, &["dep", "add", "1", "2"]).unwrap();

        let err = exec(&ctx, &["dep", "add", "2", "1"]).unwrap_err();
        assert!(matches!(err, AppError::DependencyCycle { .. }));

        exec(&ctx, &["task", "move", "2", "2024-03-19"]).unwrap();
        let ws = ctx.workspace().unwrap();
        let moved = ws.db().task(2).unwrap();
        assert_eq!(moved.start_date, NaiveDate::from_ymd_opt(2024, 3, 19));
        assert_eq!(moved.due_date, NaiveDate::from_ymd_opt(2024, 3, 22));
    }

    #[test]
    fn refused_move_leaves_task_alone() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        exec(&ctx, &["task", "add", "Pour slab", "--start", "2024-03-11", "--due", "2024-03-12"]).unwrap();
        let err = exec(&ctx, &["task", "move", "1", "not a date"]).unwrap_err();
        assert!(matches!(err, AppError::InvalidDrag(_)));
        let ws = ctx.workspace().unwrap();
        assert_eq!(ws.db().task(1).unwrap().start_date, NaiveDate::from_ymd_opt(2024, 3, 11));
    }

    #[test]
    fn prefs_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        exec(&ctx, &["prefs", "debug", "on"]).unwrap();
        exec(&ctx, &["prefs", "overlay", "anomalies", "off"]).unwrap();
        exec(&ctx, &["prefs", "view", "pipeline"]).unwrap();
        let prefs = ctx.preferences().load();
        assert!(prefs.gantt_debug_mode);
        assert!(!prefs.gantt_debug_preferences.show_anomalies);
        assert_eq!(prefs.stakeholder_view, StakeholderView::Pipeline);
    }

    #[test]
    fn export_and_backup_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        exec(&ctx, &["task", "add", "Site survey"]).unwrap();
        let out = dir.path().join("out.csv");
        exec(&ctx, &["export", "--output", out.to_str().unwrap()]).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap().lines().count(), 2);
        exec(&ctx, &["backup"]).unwrap();
        assert_eq!(fs::read_dir(dir.path().join("backup")).unwrap().count(), 1);
    }

    #[test]
    fn lead_moves_from_the_cli() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        exec(&ctx, &["stakeholder", "add", "Metro Transit", "--type", "client", "--stage", "negotiation"]).unwrap();
        exec(&ctx, &["stakeholder", "move", "1", "forward"]).unwrap();
        assert!(exec(&ctx, &["stakeholder", "move", "1", "forward"]).is_err());
        let ws = ctx.workspace().unwrap();
        assert_eq!(ws.db().stakeholder(1).unwrap().lead_status, Some(LeadStatus::Won));
    }
}
