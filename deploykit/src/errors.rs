//! Error types for deploykit

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::release::Release;

/// The hook a failed command belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPhase {
    /// `deploy_cmd`, run inside the release directory
    Deploy,

    /// `test_cmd`, run inside the release directory
    Test,

    /// `activate_cmd`, run inside the application root
    Activate,

    /// `on_failed_cmd`, run after a deploy or test hook failed
    OnFailed,
}

impl fmt::Display for CommandPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandPhase::Deploy => "deploy",
            CommandPhase::Test => "test",
            CommandPhase::Activate => "activate",
            CommandPhase::OnFailed => "on_failed",
        };
        f.write_str(name)
    }
}

/// A hook command that did not exit cleanly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandFailure {
    pub phase: CommandPhase,
    pub command: String,

    /// `None` when the command could not be started at all
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(
                f,
                "{} command exited with code {}: {}",
                self.phase, code, self.command
            ),
            None => write!(f, "{} command could not be run: {}", self.phase, self.command),
        }
    }
}

/// Main error type for deploykit
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("{0}")]
    CommandFailed(CommandFailure),

    #[error("{failure}; on_failed command also failed: {on_failed}")]
    CommandFailedWithRecovery {
        failure: CommandFailure,
        on_failed: CommandFailure,
    },

    #[error("Release {} is current but activation failed: {failure}", .release.tag)]
    ActivationFailed {
        release: Box<Release>,
        failure: CommandFailure,
    },

    #[error("No prior successful release before {0}; use select")]
    NoPriorRelease(String),

    #[error("No next successful release after {0}; use select")]
    NoNextRelease(String),

    #[error("SCM error: {0}")]
    Scm(String),

    #[error("Account error: {0}")]
    Accounts(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// The failed hook, if this error came from one
    pub fn command_failure(&self) -> Option<&CommandFailure> {
        match self {
            DeployError::CommandFailed(failure)
            | DeployError::CommandFailedWithRecovery { failure, .. }
            | DeployError::ActivationFailed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}
