use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::AniflixError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub primary: String,
    pub anilist_url: String,
    pub jikan_url: String,
    pub timeout_secs: u64,
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    /// Also write a daily rolling log file under the data directory.
    pub file: bool,
}

impl AppConfig {
    /// Load config: user file (if exists) replaces built-in defaults.
    pub fn load() -> Result<Self, AniflixError> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit path, falling back to the defaults when
    /// the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, AniflixError> {
        if path.exists() {
            let user_str =
                std::fs::read_to_string(path).map_err(|e| AniflixError::Config(e.to_string()))?;
            toml::from_str(&user_str).map_err(|e| AniflixError::Config(e.to_string()))
        } else {
            toml::from_str(DEFAULT_CONFIG).map_err(|e| AniflixError::Config(e.to_string()))
        }
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the database file.
    pub fn db_path() -> PathBuf {
        Self::data_dir().join("aniflix.db")
    }

    /// Directory for the database and log files.
    pub fn data_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, AniflixError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "aniflix")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}
