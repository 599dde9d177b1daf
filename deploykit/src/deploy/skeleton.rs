//! Application root skeleton

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::DeployError;
use crate::services::Services;
use crate::storage::layout::AppLayout;

/// Change recorded for every directory created
pub const NEW_DIR: &str = "New Dir";

/// Ownership and creation options for [`skeleton`]
#[derive(Debug, Clone, Default)]
pub struct SkeletonOptions {
    pub user: Option<String>,
    pub group: Option<String>,
    pub mode: Option<u32>,

    /// Create missing ancestors of the root as well
    pub makedirs: bool,

    /// Report the changes without creating anything
    pub dry_run: bool,
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Missing ancestors of `root`, outermost first
async fn missing_ancestors(root: &Path) -> Vec<PathBuf> {
    let mut missing = Vec::new();
    for ancestor in root.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() || is_dir(ancestor).await {
            break;
        }
        missing.push(ancestor.to_path_buf());
    }
    missing.reverse();
    missing
}

/// Create the directories of an application root that do not exist yet
///
/// Returns the created paths. Running it again on a complete root changes
/// nothing.
pub async fn skeleton(
    layout: &AppLayout,
    services: &Services,
    options: &SkeletonOptions,
) -> Result<BTreeMap<PathBuf, String>, DeployError> {
    let ancestors = missing_ancestors(layout.root()).await;
    if !ancestors.is_empty() && !options.makedirs {
        return Err(DeployError::NotFound(format!(
            "Parent directory {:?} does not exist",
            ancestors[ancestors.len() - 1]
        )));
    }

    let mut changes = BTreeMap::new();
    for dir in ancestors.into_iter().chain(layout.skeleton_dirs()) {
        if is_dir(&dir).await {
            continue;
        }
        if !options.dry_run {
            services
                .fs
                .make_directory(
                    &dir,
                    options.user.as_deref(),
                    options.group.as_deref(),
                    options.mode,
                )
                .await?;
            info!("Created {:?}", dir);
        }
        changes.insert(dir, NEW_DIR.to_string());
    }
    Ok(changes)
}
