//! Git working-copy operations

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::DeployError;
use crate::models::release::ScmKind;
use crate::services::{CommandOutput, CommandRunner, Scm};

/// [`Scm`] backed by the `git` command line
pub struct GitScm {
    commands: Arc<dyn CommandRunner>,
}

impl GitScm {
    pub fn new(commands: Arc<dyn CommandRunner>) -> Self {
        Self { commands }
    }

    async fn git(
        &self,
        args: &[&str],
        cwd: &Path,
        user: Option<&str>,
    ) -> Result<CommandOutput, DeployError> {
        let cmd = git_command(args)?;
        let output = self.commands.run(&cmd, cwd, user).await?;
        if !output.success() {
            return Err(DeployError::Scm(format!(
                "`{}` exited with code {}: {}",
                cmd,
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(output)
    }
}

/// Quote a git invocation for the shell
pub fn git_command(args: &[&str]) -> Result<String, DeployError> {
    shlex::try_join(std::iter::once("git").chain(args.iter().copied()))
        .map_err(|e| DeployError::Scm(format!("Unable to quote git arguments: {}", e)))
}

#[async_trait]
impl Scm for GitScm {
    fn kind(&self) -> ScmKind {
        ScmKind::Git
    }

    async fn clone_repository(
        &self,
        dest: &Path,
        url: &str,
        user: Option<&str>,
    ) -> Result<(), DeployError> {
        let parent = dest.parent().unwrap_or(Path::new("."));
        let dest = dest.to_string_lossy();
        debug!("Cloning {} into {}", url, dest);
        self.git(&["clone", "--", url, dest.as_ref()], parent, user).await?;
        Ok(())
    }

    async fn checkout(
        &self,
        dest: &Path,
        rev: &str,
        force: bool,
        user: Option<&str>,
    ) -> Result<(), DeployError> {
        let mut args = vec!["checkout"];
        if force {
            args.push("--force");
        }
        args.push(rev);
        self.git(&args, dest, user).await?;
        Ok(())
    }

    async fn current_revision(
        &self,
        dest: &Path,
        user: Option<&str>,
    ) -> Result<String, DeployError> {
        let output = self.git(&["rev-parse", "HEAD"], dest, user).await?;
        Ok(output.stdout.trim().to_string())
    }

    async fn fetch_remote(&self, dest: &Path, user: Option<&str>) -> Result<(), DeployError> {
        self.git(&["fetch"], dest, user).await?;
        Ok(())
    }
}
