//! Upstream drift detection for git checkouts

use std::path::Path;

use tracing::debug;

use crate::errors::DeployError;
use crate::services::scm::git_command;
use crate::services::Services;

/// Branch the checkout at `path` is on, or `None` for a detached head
pub async fn current_branch(
    services: &Services,
    path: &Path,
    user: Option<&str>,
) -> Result<Option<String>, DeployError> {
    let cmd = git_command(&["symbolic-ref", "-q", "HEAD"])?;
    let output = services.commands.run(&cmd, path, user).await?;

    match output.exit_code {
        0 => {
            let reference = output.stdout.trim();
            let branch = reference.strip_prefix("refs/heads/").unwrap_or(reference);
            Ok((!branch.is_empty()).then(|| branch.to_string()))
        }
        1 => Ok(None),
        code => Err(DeployError::Scm(format!(
            "`{}` exited with code {}: {}",
            cmd,
            code,
            output.stderr.trim()
        ))),
    }
}

/// Whether `origin/<branch>` differs from the local `branch` after a fetch
pub async fn is_remote_ahead(
    services: &Services,
    path: &Path,
    branch: &str,
    user: Option<&str>,
) -> Result<bool, DeployError> {
    services.scm.fetch_remote(path, user).await?;

    let upstream = format!("origin/{}", branch);
    let cmd = git_command(&["diff", branch, upstream.as_str(), "--"])?;
    let output = services.commands.run(&cmd, path, user).await?;
    if !output.success() {
        return Err(DeployError::Scm(format!(
            "`{}` exited with code {}: {}",
            cmd,
            output.exit_code,
            output.stderr.trim()
        )));
    }

    let drifted = !output.stdout.trim().is_empty();
    debug!("Branch {} drifted from {}: {}", branch, upstream, drifted);
    Ok(drifted)
}
