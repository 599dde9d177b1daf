//! Shell command execution

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::errors::DeployError;
use crate::services::accounts::effective_uid;
use crate::services::{Accounts, CommandRunner};

/// Result of one finished command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Exit code; `-1` when the process was killed by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs commands through `sh -c` on the local host
///
/// Commands for a user whose uid is not the process's effective uid are
/// wrapped in `<sudo> -n -u <user> --`.
#[derive(Clone)]
pub struct SystemCommandRunner {
    sudo_program: String,
    accounts: Arc<dyn Accounts>,
    effective_uid: u32,
}

impl SystemCommandRunner {
    pub fn new(sudo_program: impl Into<String>, accounts: Arc<dyn Accounts>) -> Self {
        Self {
            sudo_program: sudo_program.into(),
            accounts,
            effective_uid: effective_uid(),
        }
    }

    fn command(&self, cmd: &str, user: Option<&str>) -> Result<Command, DeployError> {
        let switch_to = match user {
            Some(user) if self.accounts.user_to_uid(user)? != self.effective_uid => Some(user),
            _ => None,
        };

        let command = match switch_to {
            Some(user) => {
                let mut command = Command::new(&self.sudo_program);
                command.args(["-n", "-u", user, "--", "sh", "-c", cmd]);
                command
            }
            None => {
                let mut command = Command::new("sh");
                command.args(["-c", cmd]);
                command
            }
        };
        Ok(command)
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        cmd: &str,
        cwd: &Path,
        user: Option<&str>,
    ) -> Result<CommandOutput, DeployError> {
        debug!("Running {:?} in {:?} as {:?}", cmd, cwd, user);

        let output = self
            .command(cmd, user)?
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .await?;

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("Command {:?} exited with {}", cmd, result.exit_code);
        Ok(result)
    }
}
