//! Runtime settings read from `SP_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::crew::DEFAULT_WEEKLY_CAPACITY;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_MAINTENANCE_HORIZON_DAYS: i64 = 14;
pub const WORKSPACE_FILE: &str = "workspace.json";
pub const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub weekly_capacity_hours: f64,
    pub debounce_ms: u64,
    pub maintenance_horizon_days: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("SP_DIR").map(PathBuf::from).unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| ".".to_string());
            PathBuf::from(home).join(".siteplan")
        });
        let capacity = parse_or(&lookup, "SP_WEEKLY_CAPACITY", DEFAULT_WEEKLY_CAPACITY);
        Config {
            data_dir,
            weekly_capacity_hours: if capacity > 0.0 { capacity } else { DEFAULT_WEEKLY_CAPACITY },
            debounce_ms: parse_or(&lookup, "SP_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS),
            maintenance_horizon_days: parse_or(&lookup, "SP_MAINTENANCE_HORIZON_DAYS", DEFAULT_MAINTENANCE_HORIZON_DAYS),
        }
    }

    pub fn workspace_path(&self) -> PathBuf {
        self.data_dir.join(WORKSPACE_FILE)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Preferences live next to whichever workspace file is in use.
pub fn preferences_path_for(workspace: &std::path::Path) -> PathBuf {
    workspace
        .parent()
        .map(|p| p.join(PREFERENCES_FILE))
        .unwrap_or_else(|| PathBuf::from(PREFERENCES_FILE))
}
