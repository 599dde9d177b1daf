//! Switching the `current` pointer

use tracing::info;

use crate::deploy::catalog;
use crate::deploy::tag::ReleaseTag;
use crate::errors::DeployError;
use crate::filesys::link::LinkState;
use crate::models::release::Release;
use crate::storage::layout::AppLayout;

/// Point `current` at `releases/<tag>`
///
/// The link is owned by the release directory's owner. No metadata is
/// checked: selecting a failed or unknown release is allowed. A `current`
/// that exists but is not a symbolic link is never touched.
pub async fn select(layout: &AppLayout, tag: &ReleaseTag) -> Result<Release, DeployError> {
    let release_dir = layout.release_dir(tag);
    if !release_dir.exists().await {
        return Err(DeployError::NotFound(format!(
            "Release {} does not exist in {:?}",
            tag,
            layout.releases_dir().path()
        )));
    }
    let (uid, gid) = release_dir.owner().await?;

    let link = layout.current_link();
    if link.state().await? == LinkState::Other {
        return Err(DeployError::InvalidState(format!(
            "{:?} exists and is not a symbolic link",
            link.path()
        )));
    }
    link.replace(&AppLayout::current_target(tag), uid, gid).await?;
    info!("Selected release {}", tag);

    catalog::current(layout)
        .await?
        .ok_or_else(|| DeployError::Internal(format!("{:?} vanished after select", link.path())))
}
