//! Release enumeration

use tracing::warn;

use crate::deploy::meta;
use crate::deploy::tag::ReleaseTag;
use crate::errors::DeployError;
use crate::filesys::link::LinkState;
use crate::models::release::Release;
use crate::storage::layout::AppLayout;

async fn assert_root(layout: &AppLayout) -> Result<(), DeployError> {
    if !layout.root_dir().exists().await {
        return Err(DeployError::NotFound(format!(
            "Application directory {:?} does not exist",
            layout.root()
        )));
    }
    Ok(())
}

/// Every release under `releases/`, ascending by tag
///
/// Entries that are not directories or whose names are not valid tags are
/// skipped.
pub async fn list(layout: &AppLayout) -> Result<Vec<Release>, DeployError> {
    assert_root(layout).await?;

    let releases_dir = layout.releases_dir();
    if !releases_dir.exists().await {
        return Err(DeployError::NotFound(format!(
            "Releases directory {:?} does not exist",
            releases_dir.path()
        )));
    }

    let mut tags = Vec::new();
    for name in releases_dir.list_dir_names().await? {
        match ReleaseTag::new(name.as_str()) {
            Ok(tag) => tags.push(tag),
            Err(e) => warn!("Skipping {:?} in {:?}: {}", name, releases_dir.path(), e),
        }
    }
    tags.sort();

    let mut releases = Vec::with_capacity(tags.len());
    for tag in &tags {
        releases.push(meta::read(layout, tag).await?);
    }
    Ok(releases)
}

/// Tag `current` points at, or `None` when there is no `current` link
pub async fn current_tag(layout: &AppLayout) -> Result<Option<ReleaseTag>, DeployError> {
    assert_root(layout).await?;

    let link = layout.current_link();
    match link.state().await? {
        LinkState::Absent => Ok(None),
        LinkState::Other => {
            warn!("{:?} exists but is not a symbolic link", link.path());
            Ok(None)
        }
        LinkState::Symlink(target) => {
            let name = target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    DeployError::InvalidState(format!(
                        "{:?} points at {:?}, which names no release",
                        link.path(),
                        target
                    ))
                })?;
            ReleaseTag::new(name)
                .map(Some)
                .map_err(|e| DeployError::InvalidState(format!("{:?}: {}", link.path(), e)))
        }
    }
}

/// The current release, flagged as current
pub async fn current(layout: &AppLayout) -> Result<Option<Release>, DeployError> {
    let Some(tag) = current_tag(layout).await? else {
        return Ok(None);
    };
    let mut release = meta::read(layout, &tag).await?;
    release.current = true;
    Ok(Some(release))
}

/// [`list`] with the current release flagged
///
/// An unreadable `current` link leaves every release unflagged.
pub async fn status(layout: &AppLayout) -> Result<Vec<Release>, DeployError> {
    let mut releases = list(layout).await?;
    match current_tag(layout).await {
        Ok(Some(tag)) => {
            if let Some(release) = releases.iter_mut().find(|r| r.tag == tag) {
                release.current = true;
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Unable to resolve current release: {}", e),
    }
    Ok(releases)
}
