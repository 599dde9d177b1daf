//! Rollback and roll-forward
//!
//! Both walk towards `current` from one end of the catalog and keep the
//! last successful release seen before reaching it, so they land on the
//! nearest successful release on that side of `current`, skipping failed
//! ones. Only the pointer moves; no hook is re-run.

use tracing::info;

use crate::deploy::tag::ReleaseTag;
use crate::deploy::{catalog, pointer};
use crate::errors::DeployError;
use crate::models::release::Release;
use crate::storage::layout::AppLayout;

/// The catalog and current tag, checked to agree with each other
async fn catalog_with_current(
    layout: &AppLayout,
) -> Result<(Vec<Release>, ReleaseTag), DeployError> {
    let current = catalog::current_tag(layout).await?.ok_or_else(|| {
        DeployError::InvalidState("There is no current release; use select".to_string())
    })?;

    let releases = catalog::list(layout).await?;
    if !releases.iter().any(|r| r.tag == current) {
        return Err(DeployError::InvalidState(format!(
            "Current release {} is not in the list of releases; use select",
            current
        )));
    }
    Ok((releases, current))
}

/// Last successful release seen before reaching `current`
fn nearest_ok<'a>(
    releases: impl Iterator<Item = &'a Release>,
    current: &ReleaseTag,
) -> Option<&'a ReleaseTag> {
    let mut found = None;
    for release in releases {
        if &release.tag == current {
            break;
        }
        if release.is_ok() {
            found = Some(&release.tag);
        }
    }
    found
}

/// Select the nearest successful release older than current
pub async fn rollback(layout: &AppLayout) -> Result<Release, DeployError> {
    let (releases, current) = catalog_with_current(layout).await?;
    let target = nearest_ok(releases.iter(), &current)
        .ok_or_else(|| DeployError::NoPriorRelease(current.to_string()))?;

    info!("Rolling back from {} to {}", current, target);
    pointer::select(layout, target).await
}

/// Select the nearest successful release newer than current
pub async fn rollforward(layout: &AppLayout) -> Result<Release, DeployError> {
    let (releases, current) = catalog_with_current(layout).await?;
    let target = nearest_ok(releases.iter().rev(), &current)
        .ok_or_else(|| DeployError::NoNextRelease(current.to_string()))?;

    info!("Rolling forward from {} to {}", current, target);
    pointer::select(layout, target).await
}
