//! `gridbind` settings, persisted as TOML.
//!
//! Every section and key is optional; anything missing takes its default.

use std::fs;
use std::path::Path;

use grid_model::FieldSourceTypeId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub display: DisplaySettings,
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Width for layout columns that carry none.
    pub default_column_width: u32,
    /// Rows printed from the simulated grid.
    pub max_rows: usize,
    pub show_hidden: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            default_column_width: 12,
            max_rows: 20,
            show_hidden: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub rows: usize,
    pub ticks: usize,
    pub seed: u64,
    pub field_sources: Vec<FieldSourceTypeId>,
    /// Every Nth tick marks a security suspect, and the next one restores it.
    /// Zero disables.
    pub invalidate_every: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            rows: 8,
            ticks: 200,
            seed: 7,
            field_sources: vec![FieldSourceTypeId::Symbol, FieldSourceTypeId::Security],
            invalidate_every: 25,
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Load settings from `path`, or defaults when there is no usable file.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let Some(path) = path else {
        return Settings::default();
    };

    match fs::read_to_string(path) {
        Ok(content) => match Settings::from_toml(&content) {
            Ok(settings) => {
                info!(path = %path.display(), "loaded settings");
                settings
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "malformed settings file, using defaults");
                Settings::default()
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "no settings file, using defaults");
            Settings::default()
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "unreadable settings file, using defaults");
            Settings::default()
        }
    }
}
