//! Converging on a desired revision
//!
//! `ensure` deploys only when the current release does not already satisfy
//! the request, so calling it again with nothing changed is a no-op.

use serde::Serialize;
use tracing::info;

use crate::deploy::deployer::DeployRequest;
use crate::deploy::{catalog, deployer, git};
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::models::release::Release;
use crate::services::Services;
use crate::storage::layout::AppLayout;

/// Desired state for [`ensure`]
#[derive(Debug, Clone)]
pub struct EnsureRequest {
    /// How to deploy when a deploy is needed; `rev` is the desired revision
    pub deploy: DeployRequest,

    /// Redeploy when the current release tracks a branch that moved upstream
    pub update_branch: bool,

    /// Report what would happen without deploying
    pub dry_run: bool,
}

impl EnsureRequest {
    pub fn new(deploy: DeployRequest) -> Self {
        Self {
            deploy,
            update_branch: true,
            dry_run: false,
        }
    }
}

/// Why a deploy is needed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DeployReason {
    /// No current release, or it has no record
    NoCurrentRelease,

    RevisionChanged {
        from: Option<String>,
        to: Option<String>,
    },

    /// The tracked branch has new upstream changes
    UpstreamDrift { branch: String },
}

/// What [`ensure`] did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum EnsureOutcome {
    /// The current release already satisfies the request
    Converged { release: Release },

    Deployed {
        reason: DeployReason,
        release: Release,
    },

    /// Dry run: a deploy would have happened
    WouldDeploy { reason: DeployReason },
}

impl EnsureOutcome {
    pub fn deployed(&self) -> bool {
        matches!(self, EnsureOutcome::Deployed { .. })
    }
}

enum Assessment {
    Converged(Release),
    Deploy(DeployReason),
}

/// Decide whether the current release satisfies `request`
async fn assess(
    layout: &AppLayout,
    services: &Services,
    request: &EnsureRequest,
) -> Result<Assessment, DeployError> {
    let current = match catalog::current(layout).await? {
        Some(release) if release.meta.is_some() => release,
        _ => return Ok(Assessment::Deploy(DeployReason::NoCurrentRelease)),
    };

    let desired = request.deploy.rev.as_deref();
    if current.rev() != desired {
        return Ok(Assessment::Deploy(DeployReason::RevisionChanged {
            from: current.rev().map(str::to_string),
            to: desired.map(str::to_string),
        }));
    }

    if request.update_branch {
        let user = match &request.deploy.user {
            Some(user) => user.clone(),
            None => {
                let (uid, _) = Dir::new(&current.path).owner().await?;
                services.accounts.uid_to_user(uid)?
            }
        };

        let user = Some(user.as_str());
        if let Some(branch) = git::current_branch(services, &current.path, user).await? {
            if git::is_remote_ahead(services, &current.path, &branch, user).await? {
                return Ok(Assessment::Deploy(DeployReason::UpstreamDrift { branch }));
            }
        }
    }

    Ok(Assessment::Converged(current))
}

/// Deploy `request` unless the current release already satisfies it
pub async fn ensure(
    layout: &AppLayout,
    services: &Services,
    request: &EnsureRequest,
) -> Result<EnsureOutcome, DeployError> {
    let reason = match assess(layout, services, request).await? {
        Assessment::Converged(release) => {
            info!("Release {} already satisfies the requested revision", release.tag);
            return Ok(EnsureOutcome::Converged { release });
        }
        Assessment::Deploy(reason) => reason,
    };

    if request.dry_run {
        info!("Would deploy: {:?}", reason);
        return Ok(EnsureOutcome::WouldDeploy { reason });
    }

    info!("Deploying: {:?}", reason);
    let release = deployer::deploy(layout, services, &request.deploy).await?;
    Ok(EnsureOutcome::Deployed { reason, release })
}
