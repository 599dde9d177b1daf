//! Local directory creation and removal

use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::errors::DeployError;
use crate::services::{Accounts, FileSystem};

/// [`FileSystem`] on the local disk
pub struct LocalFileSystem {
    accounts: Arc<dyn Accounts>,
}

impl LocalFileSystem {
    pub fn new(accounts: Arc<dyn Accounts>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn make_directory(
        &self,
        path: &Path,
        user: Option<&str>,
        group: Option<&str>,
        mode: Option<u32>,
    ) -> Result<(), DeployError> {
        debug!("Creating directory {:?}", path);
        fs::create_dir(path).await?;

        if let Some(mode) = mode {
            fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
        }

        let uid = user.map(|u| self.accounts.user_to_uid(u)).transpose()?;
        let gid = group.map(|g| self.accounts.group_to_gid(g)).transpose()?;
        if uid.is_some() || gid.is_some() {
            let meta = fs::metadata(path).await?;
            if uid.is_some_and(|uid| uid != meta.uid()) || gid.is_some_and(|gid| gid != meta.gid()) {
                std::os::unix::fs::chown(path, uid, gid)?;
            }
        }
        Ok(())
    }

    async fn remove_path(&self, path: &Path) -> Result<(), DeployError> {
        debug!("Removing {:?}", path);
        let metadata = fs::symlink_metadata(path).await?;
        if metadata.is_dir() {
            fs::remove_dir_all(path).await?;
        } else {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}
