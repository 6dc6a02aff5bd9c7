// Ambience preference persistence
// A small JSON file under the app data dir; any read failure falls back to
// defaults so playback never blocks on storage

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::SettingsError;
use crate::playback::catalog::AmbienceId;

pub const DEFAULT_AMBIENCE_VOLUME: f32 = 0.7;

const SETTINGS_FILE: &str = "ambience.json";

/// The two durable ambience preferences: what to play and how loud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbienceSettings {
    pub selection: Option<AmbienceId>,
    pub volume: f32,
}

impl Default for AmbienceSettings {
    fn default() -> Self {
        Self {
            selection: None,
            volume: DEFAULT_AMBIENCE_VOLUME,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AmbienceStore {
    app_dir: PathBuf,
}

impl AmbienceStore {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
        }
    }

    fn settings_path(&self) -> PathBuf {
        self.app_dir.join(SETTINGS_FILE)
    }

    /// Load persisted preferences. Missing or unreadable files yield the
    /// defaults (`selection = none`, volume 0.7).
    pub fn load(&self) -> AmbienceSettings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("[Settings] {}; using defaults", e);
                AmbienceSettings::default()
            }
        }
    }

    fn try_load(&self) -> Result<AmbienceSettings, SettingsError> {
        let path = self.settings_path();

        if !path.exists() {
            log::debug!("[Settings] No ambience settings file, using defaults");
            return Ok(AmbienceSettings::default());
        }

        let content =
            fs::read_to_string(&path).map_err(|e| SettingsError::Read(e.to_string()))?;

        let mut settings: AmbienceSettings =
            serde_json::from_str(&content).map_err(|e| SettingsError::Read(e.to_string()))?;

        // A hand-edited or corrupt volume still has to land in range.
        settings.volume = settings.volume.clamp(0.0, 1.0);
        Ok(settings)
    }

    /// Save preferences to disk.
    pub fn save(&self, settings: &AmbienceSettings) -> Result<(), SettingsError> {
        fs::create_dir_all(&self.app_dir).map_err(|e| SettingsError::Write(e.to_string()))?;

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| SettingsError::Write(e.to_string()))?;

        fs::write(self.settings_path(), content).map_err(|e| SettingsError::Write(e.to_string()))
    }
}
