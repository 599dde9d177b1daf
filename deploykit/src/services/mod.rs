//! External collaborators
//!
//! The lifecycle engine never runs processes, talks to source control,
//! resolves accounts or creates directories itself. It goes through the
//! traits below, handed to it in a [`Services`] bundle.

pub mod accounts;
pub mod command;
pub mod fs;
pub mod scm;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::DeployError;
use crate::models::release::ScmKind;

pub use accounts::SystemAccounts;
pub use command::{CommandOutput, SystemCommandRunner};
pub use fs::LocalFileSystem;
pub use scm::GitScm;

/// Runs shell commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` through a shell in `cwd`, as `user` when given
    ///
    /// A non-zero exit is reported in the output, not as an error.
    async fn run(
        &self,
        cmd: &str,
        cwd: &Path,
        user: Option<&str>,
    ) -> Result<CommandOutput, DeployError>;
}

/// Source-control operations on a working copy
#[async_trait]
pub trait Scm: Send + Sync {
    fn kind(&self) -> ScmKind;

    /// Clone `url` into `dest`
    async fn clone_repository(
        &self,
        dest: &Path,
        url: &str,
        user: Option<&str>,
    ) -> Result<(), DeployError>;

    /// Check out `rev`, discarding local modifications when `force` is set
    async fn checkout(
        &self,
        dest: &Path,
        rev: &str,
        force: bool,
        user: Option<&str>,
    ) -> Result<(), DeployError>;

    /// Revision id of the checked-out commit
    async fn current_revision(&self, dest: &Path, user: Option<&str>)
        -> Result<String, DeployError>;

    /// Update remote-tracking refs
    async fn fetch_remote(&self, dest: &Path, user: Option<&str>) -> Result<(), DeployError>;
}

/// User and group resolution
pub trait Accounts: Send + Sync {
    fn user_to_uid(&self, user: &str) -> Result<u32, DeployError>;

    fn group_to_gid(&self, group: &str) -> Result<u32, DeployError>;

    fn uid_to_user(&self, uid: u32) -> Result<String, DeployError>;

    fn gid_to_group(&self, gid: u32) -> Result<String, DeployError>;
}

/// Directory creation and removal
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Create a single directory with the given ownership and mode
    async fn make_directory(
        &self,
        path: &Path,
        user: Option<&str>,
        group: Option<&str>,
        mode: Option<u32>,
    ) -> Result<(), DeployError>;

    /// Remove a file, or a directory recursively
    async fn remove_path(&self, path: &Path) -> Result<(), DeployError>;
}

/// The collaborators one release manager works with
#[derive(Clone)]
pub struct Services {
    pub commands: Arc<dyn CommandRunner>,
    pub scm: Arc<dyn Scm>,
    pub accounts: Arc<dyn Accounts>,
    pub fs: Arc<dyn FileSystem>,
}

impl Services {
    /// Collaborators backed by the local host
    pub fn system(sudo_program: &str) -> Self {
        let accounts: Arc<dyn Accounts> = Arc::new(SystemAccounts::new());
        let commands: Arc<dyn CommandRunner> =
            Arc::new(SystemCommandRunner::new(sudo_program, accounts.clone()));
        Self {
            scm: Arc::new(GitScm::new(commands.clone())),
            fs: Arc::new(LocalFileSystem::new(accounts.clone())),
            commands,
            accounts,
        }
    }
}
