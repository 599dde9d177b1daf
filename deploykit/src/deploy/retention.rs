//! Pruning old releases

use tracing::info;

use crate::deploy::catalog;
use crate::errors::DeployError;
use crate::models::release::Release;
use crate::services::Services;
use crate::storage::layout::AppLayout;

/// Default number of releases kept
pub const DEFAULT_KEEP: usize = 5;

/// Releases that fall outside the newest `keep`, minus the current one
pub fn prune_candidates(releases: Vec<Release>, keep: usize) -> Vec<Release> {
    let excess = releases.len().saturating_sub(keep);
    releases
        .into_iter()
        .take(excess)
        .filter(|release| !release.current)
        .collect()
}

/// Remove every release older than the newest `keep`, never the current one
///
/// Fails without removing anything when `current` cannot be resolved.
pub async fn limit_history(
    layout: &AppLayout,
    services: &Services,
    keep: usize,
) -> Result<Vec<Release>, DeployError> {
    let mut releases = catalog::list(layout).await?;
    let current = catalog::current_tag(layout).await?;
    for release in &mut releases {
        release.current = current.as_ref() == Some(&release.tag);
    }
    let candidates = prune_candidates(releases, keep);

    let mut removed = Vec::with_capacity(candidates.len());
    for release in candidates {
        services.fs.remove_path(&release.path).await?;
        info!("Removed old and unused release {}", release.tag);
        removed.push(release);
    }
    Ok(removed)
}
