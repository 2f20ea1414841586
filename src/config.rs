//! User settings loaded from `config.yml` in the platform config directory.
//!
//! A missing file means defaults. `DAYPLAN_DATA_DIR` overrides where boards
//! and logs are written.

use crate::date::WeekStart;
use crate::timer::{default_presets, Preset};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "DAYPLAN_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub week_start: WeekStart,
    pub presets: Vec<Preset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            week_start: WeekStart::Monday,
            presets: default_presets(),
            data_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let data =
            fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        let config: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {:?}", path))?;
        Ok(config)
    }

    /// Env override, then the configured directory, then the platform default.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let dirs = project_dirs().context("locating data directory")?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

pub fn config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.yml"))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "dayplan")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.yml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.presets.len(), 12);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "week_start: sunday\npresets:\n  - label: pomodoro\n    seconds: 1500\n",
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.week_start, WeekStart::Sunday);
        assert_eq!(config.presets, vec![Preset::new("pomodoro", 1500)]);
        assert_eq!(config.log_level, "info");
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "week_start: [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn configured_data_dir_is_used() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/dayplan-data")),
            ..Config::default()
        };
        if env::var_os(DATA_DIR_ENV).is_none() {
            assert_eq!(
                config.resolve_data_dir().unwrap(),
                PathBuf::from("/tmp/dayplan-data")
            );
        }
    }
}
