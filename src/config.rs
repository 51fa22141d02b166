//! Console configuration.
//!
//! Read from `config.json` in the platform config directory when present;
//! command-line flags and environment variables override individual fields.
//!
//! ```json
//! {
//!   "api_url": "http://localhost:8000",
//!   "log_level": "info",
//!   "request_timeout_secs": 30
//! }
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to get project directories")]
    NoProjectDirs,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the OpinionLens API, without the `/api/v1` prefix.
    pub api_url: String,
    /// Where the key-value cache lives. Platform data directory when unset.
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    /// No timeout when unset.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: None,
            log_level: "info".to_string(),
            request_timeout_secs: None,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("dev", "opinionlens", "OpinionLens").ok_or(ConfigError::NoProjectDirs)
}

impl ConsoleConfig {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(project_dirs()?.config_dir().join("config.json"))
    }

    /// Loads `path`, or the default location if `None`. A missing default
    /// file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Ok(p) => (p, false),
                Err(_) => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
