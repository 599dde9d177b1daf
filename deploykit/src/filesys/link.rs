//! Symbolic link operations

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::errors::DeployError;

/// What currently occupies a link path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing at the path
    Absent,

    /// A symbolic link, with its raw target
    Symlink(PathBuf),

    /// A regular file, directory or other non-link entry
    Other,
}

/// A symbolic link wrapper with path
#[derive(Debug, Clone)]
pub struct Link {
    path: PathBuf,
}

impl Link {
    /// Create a new link reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the link path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inspect the path without following it
    pub async fn state(&self) -> Result<LinkState, DeployError> {
        match fs::symlink_metadata(&self.path).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                Ok(LinkState::Symlink(fs::read_link(&self.path).await?))
            }
            Ok(_) => Ok(LinkState::Other),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LinkState::Absent),
            Err(e) => Err(e.into()),
        }
    }

    /// Create the link pointing at `target` and chown the link itself
    pub async fn create(&self, target: &Path, uid: u32, gid: u32) -> Result<(), DeployError> {
        fs::symlink(target, &self.path).await?;
        lchown(&self.path, uid, gid)?;
        Ok(())
    }

    /// Point the link at `target`, replacing any existing link in one rename
    ///
    /// A staged link is created next to the final path and renamed over it,
    /// so readers see either the old or the new target, never a missing link.
    /// Callers must first make sure the path is not a real file or directory.
    pub async fn replace(&self, target: &Path, uid: u32, gid: u32) -> Result<(), DeployError> {
        let staged = self.staged_path();
        debug!("Staging link {:?} -> {:?}", staged, target);

        if let Err(e) = self.stage(&staged, target, uid, gid).await {
            let _ = fs::remove_file(&staged).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&staged, &self.path).await {
            let _ = fs::remove_file(&staged).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn stage(&self, staged: &Path, target: &Path, uid: u32, gid: u32) -> Result<(), DeployError> {
        fs::symlink(target, staged).await?;
        lchown(staged, uid, gid)?;
        Ok(())
    }

    fn staged_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!(".{}.{}", name, uuid::Uuid::new_v4().simple()))
    }
}

/// Change ownership of a link without following it
///
/// Skipped when the link already has the requested owner, so unprivileged
/// callers managing their own trees do not need `CAP_CHOWN`.
fn lchown(path: &Path, uid: u32, gid: u32) -> Result<(), DeployError> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::symlink_metadata(path)?;
    if meta.uid() == uid && meta.gid() == gid {
        return Ok(());
    }
    std::os::unix::fs::lchown(path, Some(uid), Some(gid))?;
    Ok(())
}
