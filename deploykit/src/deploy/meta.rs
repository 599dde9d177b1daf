//! Per-release metadata persistence

use tracing::debug;

use crate::deploy::tag::ReleaseTag;
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::models::release::{Release, ReleaseMeta};
use crate::storage::layout::{AppLayout, META_FILE};

/// Persist `meta` as the release's `META`, replacing any existing file
pub async fn write(release_dir: &Dir, meta: &ReleaseMeta) -> Result<(), DeployError> {
    let file = release_dir.file(META_FILE);
    debug!("Writing {:?}: ok={}", file.path(), meta.ok);
    file.write_json_atomic(meta).await
}

/// Read a release's record, merged with its tag and path
///
/// A missing `META` is not an error: the release comes back with no
/// record, marking it as unknown or incomplete.
pub async fn read(layout: &AppLayout, tag: &ReleaseTag) -> Result<Release, DeployError> {
    let meta = layout.meta_file(tag).read_json_opt::<ReleaseMeta>().await?;
    Ok(Release {
        tag: tag.clone(),
        path: layout.release_dir(tag).path().to_path_buf(),
        meta,
        current: false,
    })
}
