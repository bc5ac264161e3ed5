//! Global calbook configuration.

use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{CalbookError, CalbookResult};
use crate::recurrence::DEFAULT_WALK_LIMIT;

static DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_SCHEDULE_LENGTH: usize = 10;

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_walk_limit() -> u32 {
    DEFAULT_WALK_LIMIT
}

fn default_schedule_length() -> usize {
    DEFAULT_SCHEDULE_LENGTH
}

/// Global configuration at ~/.config/calbook/config.toml
///
/// Every field has a default, so a missing or empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalbookConfig {
    /// Zone for calendars created without an explicit one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    /// Calendar selected when a new session starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_calendar: Option<String>,

    /// Maximum number of days a recurrence expansion may walk.
    #[serde(default = "default_walk_limit")]
    pub recurrence_walk_limit: u32,

    /// Number of events returned by schedule queries.
    #[serde(default = "default_schedule_length")]
    pub schedule_length: usize,
}

impl Default for CalbookConfig {
    fn default() -> Self {
        CalbookConfig {
            default_timezone: default_timezone(),
            default_calendar: None,
            recurrence_walk_limit: default_walk_limit(),
            schedule_length: default_schedule_length(),
        }
    }
}

impl CalbookConfig {
    pub fn config_path() -> CalbookResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalbookError::Config("Could not determine config directory".into()))?
            .join("calbook");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location. A missing file yields the defaults.
    pub fn load() -> CalbookResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> CalbookResult<Self> {
        Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .build()
            .map_err(|e| CalbookError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalbookError::Config(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> CalbookResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CalbookError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalbookError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, content)
            .map_err(|e| CalbookError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CalbookConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, CalbookConfig::default());
        assert_eq!(config.schedule_length, 10);
        assert_eq!(config.default_timezone, "UTC");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "default_timezone = \"Asia/Tokyo\"\ndefault_calendar = \"home\"\n",
        )
        .unwrap();

        let config = CalbookConfig::load_from(&path).unwrap();
        assert_eq!(config.default_timezone, "Asia/Tokyo");
        assert_eq!(config.default_calendar.as_deref(), Some("home"));
        assert_eq!(config.recurrence_walk_limit, DEFAULT_WALK_LIMIT);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "schedule_length = \"many\"\n").unwrap();

        assert!(matches!(
            CalbookConfig::load_from(&path),
            Err(CalbookError::Config(_))
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = CalbookConfig {
            default_calendar: Some("work".to_string()),
            schedule_length: 5,
            ..CalbookConfig::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(CalbookConfig::load_from(&path).unwrap(), config);
    }
}
