//! Studio configuration — loads optional ~/.aura/studio.yaml.
//!
//! Every field has a default, so a missing file, an empty file and a file
//! naming a single key all produce a usable configuration.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::{BusSettings, DeviceSettings};
use crate::instrument::VoiceSettings;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Studio configuration loaded from ~/.aura/studio.yaml.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Output device overrides.
    pub device: DeviceSettings,
    /// Master bus and analyzer.
    pub bus: BusSettings,
    /// Envelope constants shared by every voice.
    pub voice: VoiceSettings,
}

/// Default path for the studio config.
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".aura");
    path.push("studio.yaml");
    path
}

/// Load a config from a YAML file. Returns defaults if the file doesn't exist.
pub fn load_config_from(path: &Path) -> Result<StudioConfig, ConfigError> {
    if !path.exists() {
        return Ok(StudioConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(StudioConfig::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

/// Save a config to a YAML file, creating parent directories as needed.
pub fn save_config(path: &Path, config: &StudioConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Load ~/.aura/studio.yaml, falling back to defaults on any error.
pub fn load_config() -> StudioConfig {
    let path = default_config_path();
    match load_config_from(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("ignoring {}: {e}", path.display());
            StudioConfig::default()
        }
    }
}
