//! UI preferences kept in `preferences.json` beside the workspace.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::fields::StakeholderView;
use crate::gantt::debug::DebugPreferences;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    #[serde(rename = "gantt-debug-mode", default)]
    pub gantt_debug_mode: bool,
    #[serde(rename = "gantt-debug-preferences", default)]
    pub gantt_debug_preferences: DebugPreferences,
    #[serde(rename = "stakeholder-view", default)]
    pub stakeholder_view: StakeholderView,
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PreferenceStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Preferences are cosmetic: a missing or unreadable file yields the
    /// defaults.
    pub fn load(&self) -> Preferences {
        let Ok(text) = fs::read_to_string(&self.path) else {
            debug!(path = %self.path.display(), "no preferences file, using defaults");
            return Preferences::default();
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "ignoring unreadable preferences");
            Preferences::default()
        })
    }

    pub fn save(&self, prefs: &Preferences) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(prefs)?)?;
        Ok(())
    }

    /// Load, change and write back in one step.
    pub fn update(&self, f: impl FnOnce(&mut Preferences)) -> AppResult<Preferences> {
        let mut prefs = self.load();
        f(&mut prefs);
        self.save(&prefs)?;
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_the_documented_names() {
        let prefs = Preferences {
            gantt_debug_mode: true,
            stakeholder_view: StakeholderView::Pipeline,
            ..Default::default()
        };
        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["gantt-debug-mode"], true);
        assert_eq!(json["stakeholder-view"], "pipeline");
        assert_eq!(json["gantt-debug-preferences"]["showTimeline"], true);
    }

    #[test]
    fn missing_or_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("preferences.json"));
        assert_eq!(store.load(), Preferences::default());
        fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("sub").join("preferences.json"));
        store.update(|p| p.gantt_debug_preferences.show_anomalies = false).unwrap();
        let loaded = store.load();
        assert!(!loaded.gantt_debug_preferences.show_anomalies);
        assert!(!loaded.gantt_debug_mode);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("preferences.json"));
        fs::write(store.path(), r#"{"stakeholder-view":"cards"}"#).unwrap();
        let loaded = store.load();
        assert_eq!(loaded.stakeholder_view, StakeholderView::Cards);
        assert_eq!(loaded.gantt_debug_preferences, DebugPreferences::default());
    }
}
