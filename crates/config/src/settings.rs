// Grid settings
// Loaded from ~/.config/tabgrid/settings.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tabgrid_engine::{GridOptions, IdSequence, KindDefaults};

use crate::error::ConfigError;

/// Id generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdSettings {
    /// Prefix for generated row ids
    pub row_prefix: String,

    /// Prefix for generated column ids
    pub column_prefix: String,

    /// First counter value
    pub start: u64,
}

impl Default for IdSettings {
    fn default() -> Self {
        Self {
            row_prefix: "_r".to_string(),
            column_prefix: "_c".to_string(),
            start: 1,
        }
    }
}

/// Fallback cell text per row kind, used when neither the row nor the
/// column supplies content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultContent {
    pub title: String,
    pub body: String,
    pub footer: String,
}

/// Whether definitions built from the command line create missing
/// counterparts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateSettings {
    pub missing_columns: bool,
    pub missing_rows: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ids: IdSettings,
    pub defaults: DefaultContent,
    pub generate: GenerateSettings,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabgrid");
        config_dir.join("settings.toml")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}: {}; using default settings", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load and validate settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Generated row and column ids must be distinguishable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ids.row_prefix.is_empty() || self.ids.column_prefix.is_empty() {
            return Err(ConfigError::Validation("id prefixes must not be empty".to_string()));
        }
        if self.ids.row_prefix == self.ids.column_prefix {
            return Err(ConfigError::Validation(format!(
                "row and column prefixes are both '{}'",
                self.ids.row_prefix
            )));
        }
        Ok(())
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save current settings to disk
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        fs::write(path, self.to_toml_string()?).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Engine options for a new grid family
    pub fn grid_options(&self) -> GridOptions {
        GridOptions::default()
            .with_ids(IdSequence::starting_at(self.ids.start))
            .with_prefixes(self.ids.row_prefix.clone(), self.ids.column_prefix.clone())
            .with_defaults(KindDefaults {
                title: self.defaults.title.clone(),
                body: self.defaults.body.clone(),
                footer: self.defaults.footer.clone(),
            })
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
