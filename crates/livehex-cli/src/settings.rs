//! Last used connection target, kept between runs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

pub fn settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
    Ok(config_dir.join("livehex").join("settings.toml"))
}

impl Settings {
    /// Stored settings, or empty ones when there are none yet.
    pub fn load() -> Self {
        match settings_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                debug!("{}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No settings at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            debug!("Ignoring unreadable settings {}: {}", path.display(), e);
            Self::default()
        })
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, content).context("Failed to write settings file")?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }
}
