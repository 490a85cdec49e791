//! CSV export of the schedule and timestamped workspace backups.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone, Utc};
use tracing::info;

use crate::db::Database;
use crate::error::AppResult;
use crate::task::Task;

pub const TASK_CSV_HEADER: &str =
    "ID,Title,Project,Status,Priority,Category,Start,Due,EstimatedHours,Progress,Assignees,Skills,CreatedUTC,UpdatedUTC";

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskExportFilter {
    pub project_id: Option<u64>,
    pub include_completed: bool,
}

impl TaskExportFilter {
    fn keeps(&self, task: &Task) -> bool {
        (self.include_completed || !task.is_completed())
            && self.project_id.map_or(true, |p| task.project_id == Some(p))
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn timestamp(secs: i64) -> String {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}

/// Render the matching tasks as CSV. Returns the text and the row count.
pub fn tasks_csv(db: &Database, filter: TaskExportFilter) -> (String, usize) {
    let mut out = String::new();
    out.push_str(TASK_CSV_HEADER);
    out.push('\n');

    let mut count = 0;
    for task in db.tasks.iter().filter(|t| filter.keeps(t)) {
        let project = task
            .project_id
            .and_then(|id| db.project(id))
            .map(|p| p.name.as_str())
            .unwrap_or("-");
        let assignees: Vec<String> = task
            .assignees
            .iter()
            .map(|id| db.member(*id).map_or_else(|| id.to_string(), |m| m.name.clone()))
            .collect();
        let fields = [
            task.id.to_string(),
            escape_csv(&task.title),
            escape_csv(project),
            task.status.label().to_string(),
            task.priority.label().to_string(),
            escape_csv(task.category.as_deref().unwrap_or("-")),
            task.start_date.map_or("-".to_string(), |d| d.to_string()),
            task.due_date.map_or("-".to_string(), |d| d.to_string()),
            task.estimated_hours.map_or("-".to_string(), |h| h.to_string()),
            task.progress.to_string(),
            escape_csv(&assignees.join(";")),
            escape_csv(&task.required_skills.join(";")),
            timestamp(task.created_at_utc),
            timestamp(task.updated_at_utc),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
        count += 1;
    }
    (out, count)
}

pub fn write_tasks_csv(db: &Database, filter: TaskExportFilter, output: &Path) -> AppResult<usize> {
    let (csv, count) = tasks_csv(db, filter);
    fs::write(output, csv)?;
    info!(path = %output.display(), tasks = count, "tasks exported");
    Ok(count)
}

/// Copy the workspace file into `backup/` beside it, prefixed with the
/// local time.
pub fn create_backup(db_path: &Path) -> AppResult<PathBuf> {
    if !db_path.exists() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "workspace file does not exist").into());
    }
    let parent = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let name = db_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workspace.json");
    let backup_path = backup_dir.join(format!("{stamp}_{name}"));
    fs::copy(db_path, &backup_path)?;
    info!(path = %backup_path.display(), "backup created");
    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TaskStatus;
    use crate::task::Project;

    fn db() -> Database {
        let mut db = Database::default();
        db.projects.push(Project {
            id: 1,
            name: "Harbour Apartments".into(),
            location: None,
            start_date: None,
            end_date: None,
        });
        let mut pour = Task::new(1, "Pour slab, level 1", 0);
        pour.project_id = Some(1);
        pour.required_skills = vec!["concrete".into(), "formwork".into()];
        db.tasks.push(pour);
        let mut done = Task::new(2, "Survey", 0);
        done.status = TaskStatus::Completed;
        db.tasks.push(done);
        db
    }

    #[test]
    fn escapes_quotes_and_commas() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a, b"), "\"a, b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn completed_tasks_need_opt_in() {
        let db = db();
        let (csv, count) = tasks_csv(&db, TaskExportFilter::default());
        assert_eq!(count, 1);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("1,\"Pour slab, level 1\",Harbour Apartments,"));
        assert!(row.contains("concrete;formwork"));

        let all = TaskExportFilter { include_completed: true, ..Default::default() };
        assert_eq!(tasks_csv(&db, all).1, 2);
        let other = TaskExportFilter { project_id: Some(2), include_completed: true };
        assert_eq!(tasks_csv(&db, other).1, 0);
    }

    #[test]
    fn backup_lands_in_backup_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.json");
        assert!(create_backup(&path).is_err());
        fs::write(&path, "{}").unwrap();
        let backup = create_backup(&path).unwrap();
        assert_eq!(backup.parent().unwrap(), dir.path().join("backup"));
        assert!(backup.to_string_lossy().ends_with("_workspace.json"));
        assert_eq!(fs::read_to_string(backup).unwrap(), "{}");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tasks.csv");
        assert_eq!(write_tasks_csv(&db(), TaskExportFilter::default(), &out).unwrap(), 1);
        assert!(fs::read_to_string(out).unwrap().starts_with("ID,Title"));
    }
}
