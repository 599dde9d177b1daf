//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Environment variable naming the settings file
pub const CONFIG_ENV_VAR: &str = "DEPLOYKIT_CONFIG";

/// deploykit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily-rolling log files into this directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Releases kept by `limit-history` when no count is given
    #[serde(default = "default_keep_releases")]
    pub keep_releases: usize,

    /// Whether `ensure` checks tracked branches for upstream changes
    #[serde(default = "default_true")]
    pub update_branch: bool,

    /// Program used to run hooks as another user
    #[serde(default = "default_sudo_program")]
    pub sudo_program: String,
}

fn default_true() -> bool {
    true
}

fn default_keep_releases() -> usize {
    5
}

fn default_sudo_program() -> String {
    "sudo".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            keep_releases: default_keep_releases(),
            update_branch: true,
            sudo_program: default_sudo_program(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, the environment-named file, or defaults
    pub async fn load(path: Option<PathBuf>) -> Result<Self, DeployError> {
        let path = path.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
        let Some(path) = path else {
            return Ok(Self::default());
        };

        File::new(&path).read_json().await.map_err(|e| {
            DeployError::ConfigError(format!("Unable to read settings file {:?}: {}", path, e))
        })
    }
}
