//! Deploying a new release
//!
//! A deploy clones the repository into `releases/<tag>`, checks out the
//! requested revision, runs the deploy and test hooks, links the shared log
//! directory, persists `META` and only then switches `current`. The
//! activation hook runs after the switch and is not part of the commit: a
//! failing activation leaves the new release selected.

use std::path::Path;

use tracing::{debug, error, info};

use crate::deploy::tag::ReleaseTag;
use crate::deploy::{meta, pointer};
use crate::errors::{CommandFailure, CommandPhase, DeployError};
use crate::filesys::dir::Dir;
use crate::filesys::link::{Link, LinkState};
use crate::models::release::{Release, ReleaseMeta};
use crate::services::Services;
use crate::storage::layout::AppLayout;

/// Suffix given to a `log` path shipped inside the repository
pub const SHIPPED_LOG_SUFFIX: &str = "-old";

/// Everything a deploy needs besides the application root
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// Repository location handed to the SCM
    pub repository: String,

    /// Revision or branch to check out; the clone's default when `None`
    pub rev: Option<String>,

    /// Defaults to the owner of `releases/`
    pub user: Option<String>,

    /// Defaults to the group of `releases/`
    pub group: Option<String>,

    /// Build step, run in the release directory
    pub deploy_cmd: Option<String>,

    /// Verification step, run in the release directory before linking
    pub test_cmd: Option<String>,

    /// Run in the release directory when the deploy or test hook fails
    pub on_failed_cmd: Option<String>,

    /// Run in the application root after `current` was switched
    pub activate_cmd: Option<String>,

    /// Caller-chosen tag; a timestamp tag is generated when `None`
    pub tag: Option<ReleaseTag>,
}

/// Who a release is deployed as
#[derive(Debug, Clone)]
struct Identity {
    user: String,
    uid: u32,
    gid: u32,
}

async fn resolve_identity(
    layout: &AppLayout,
    services: &Services,
    request: &DeployRequest,
) -> Result<Identity, DeployError> {
    let (owner_uid, owner_gid) = layout.releases_dir().owner().await?;
    let accounts = &services.accounts;

    let user = match &request.user {
        Some(user) => user.clone(),
        None => accounts.uid_to_user(owner_uid)?,
    };
    let group = match &request.group {
        Some(group) => group.clone(),
        None => accounts.gid_to_group(owner_gid)?,
    };

    Ok(Identity {
        uid: accounts.user_to_uid(&user)?,
        gid: accounts.group_to_gid(&group)?,
        user,
    })
}

/// Run one hook; `Err` describes how it failed
pub(crate) async fn run_hook(
    services: &Services,
    phase: CommandPhase,
    cmd: &str,
    cwd: &Path,
    user: Option<&str>,
) -> Result<(), CommandFailure> {
    info!("Executing {} command", phase);
    let failure = match services.commands.run(cmd, cwd, user).await {
        Ok(output) if output.success() => return Ok(()),
        Ok(output) => CommandFailure {
            phase,
            command: cmd.to_string(),
            exit_code: Some(output.exit_code),
            stderr: output.stderr,
        },
        Err(e) => CommandFailure {
            phase,
            command: cmd.to_string(),
            exit_code: None,
            stderr: e.to_string(),
        },
    };
    error!("{}", failure);
    Err(failure)
}

/// Handle a failed deploy or test hook: run `on_failed_cmd`, persist the
/// failed record, and build the error to return
async fn fail_release(
    services: &Services,
    request: &DeployRequest,
    release_dir: &Dir,
    user: &str,
    meta: &ReleaseMeta,
    failure: CommandFailure,
) -> DeployError {
    let on_failed = match &request.on_failed_cmd {
        Some(cmd) => run_hook(services, CommandPhase::OnFailed, cmd, release_dir.path(), Some(user))
            .await
            .err(),
        None => None,
    };

    if let Err(e) = meta::write(release_dir, meta).await {
        error!("Unable to persist failed release record: {}", e);
        return e;
    }

    match on_failed {
        Some(on_failed) => DeployError::CommandFailedWithRecovery { failure, on_failed },
        None => DeployError::CommandFailed(failure),
    }
}

/// Point the release's `log` at the shared log directory, moving a shipped
/// `log` aside first
async fn link_shared_log(release_dir: &Dir, identity: &Identity) -> Result<(), DeployError> {
    let log = Link::new(release_dir.path().join("log"));
    if log.state().await? != LinkState::Absent {
        let moved = release_dir.path().join(format!("log{}", SHIPPED_LOG_SUFFIX));
        debug!("Moving shipped {:?} to {:?}", log.path(), moved);
        tokio::fs::rename(log.path(), &moved).await?;
    }
    log.create(&AppLayout::release_log_target(), identity.uid, identity.gid)
        .await
}

/// Deploy a new release and make it current
pub async fn deploy(
    layout: &AppLayout,
    services: &Services,
    request: &DeployRequest,
) -> Result<Release, DeployError> {
    let tag = request.tag.clone().unwrap_or_else(ReleaseTag::generate);

    if !layout.releases_dir().exists().await {
        return Err(DeployError::NotFound(format!(
            "Releases directory {:?} does not exist",
            layout.releases_dir().path()
        )));
    }
    let release_dir = layout.release_dir(&tag);
    if tokio::fs::symlink_metadata(release_dir.path()).await.is_ok() {
        return Err(DeployError::InvalidState(format!(
            "Release {} already exists",
            tag
        )));
    }

    let identity = resolve_identity(layout, services, request).await?;
    let user = Some(identity.user.as_str());
    info!("Deploying {} as release {} (user {})", request.repository, tag, identity.user);

    services
        .scm
        .clone_repository(release_dir.path(), &request.repository, user)
        .await?;
    info!("Repository cloned successfully");

    if let Some(rev) = &request.rev {
        services.scm.checkout(release_dir.path(), rev, true, user).await?;
        info!("Checked out {}", rev);
    }

    let mut meta = ReleaseMeta::new(request.rev.clone(), services.scm.kind());
    let commit = services.scm.current_revision(release_dir.path(), user).await?;
    info!("Commit {}", commit);
    meta.commit = Some(commit);

    if let Some(cmd) = &request.deploy_cmd {
        if let Err(failure) =
            run_hook(services, CommandPhase::Deploy, cmd, release_dir.path(), user).await
        {
            meta.deploy_cmd_ok = Some(false);
            let err =
                fail_release(services, request, &release_dir, &identity.user, &meta, failure).await;
            return Err(err);
        }
        meta.deploy_cmd_ok = Some(true);
    }

    if let Some(cmd) = &request.test_cmd {
        if let Err(failure) =
            run_hook(services, CommandPhase::Test, cmd, release_dir.path(), user).await
        {
            meta.test_cmd_ok = Some(false);
            let err =
                fail_release(services, request, &release_dir, &identity.user, &meta, failure).await;
            return Err(err);
        }
        meta.test_cmd_ok = Some(true);
    }

    link_shared_log(&release_dir, &identity).await?;

    meta.ok = true;
    meta::write(&release_dir, &meta).await?;

    let release = pointer::select(layout, &tag).await?;

    if let Some(cmd) = &request.activate_cmd {
        activate(layout, services, &identity.user, cmd)
            .await
            .map_err(|failure| DeployError::ActivationFailed {
                release: Box::new(release.clone()),
                failure,
            })?;
    }

    info!("Release {} deployed", tag);
    Ok(release)
}

/// Run an activation command in the application root
pub async fn activate(
    layout: &AppLayout,
    services: &Services,
    user: &str,
    activate_cmd: &str,
) -> Result<(), CommandFailure> {
    run_hook(services, CommandPhase::Activate, activate_cmd, layout.root(), Some(user)).await
}
