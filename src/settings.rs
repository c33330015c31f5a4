//! Mutable user preferences, persisted as a small JSON document.
//!
//! The language preference is read fresh for every file so a change made by
//! the menu-bar app takes effect on the next transcription, not the next
//! restart. A missing or unreadable settings file falls back to "auto".

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE: &str = "auto";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

/// Provider for the settings document. Cheap to clone; every read hits the
/// filesystem by design.
#[derive(Debug, Clone)]
pub struct SettingsSource {
    path: PathBuf,
}

impl SettingsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load current settings, tolerating a missing or corrupt file.
    pub fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Settings::default(),
        }
    }

    /// Current language preference.
    pub fn language(&self) -> String {
        self.load().language
    }

    /// Persist a new language preference.
    pub fn set_language(&self, language: &str) -> Result<()> {
        let mut settings = self.load();
        settings.language = language.to_string();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&settings)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write settings: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_defaults_to_auto() {
        let temp = TempDir::new().unwrap();
        let source = SettingsSource::new(temp.path().join("settings.json"));
        assert_eq!(source.language(), "auto");
    }

    #[test]
    fn corrupt_file_defaults_to_auto() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let source = SettingsSource::new(path);
        assert_eq!(source.language(), "auto");
    }

    #[test]
    fn set_language_round_trips() {
        let temp = TempDir::new().unwrap();
        let source = SettingsSource::new(temp.path().join("settings.json"));

        source.set_language("sv").unwrap();
        assert_eq!(source.language(), "sv");

        // A second source over the same file sees the change immediately.
        let other = SettingsSource::new(source.path());
        assert_eq!(other.language(), "sv");
    }
}
