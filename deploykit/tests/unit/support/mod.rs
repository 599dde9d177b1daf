//! Fake collaborators and fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use deploykit::deploy::deployer::DeployRequest;
use deploykit::deploy::skeleton::SkeletonOptions;
use deploykit::deploy::tag::ReleaseTag;
use deploykit::deploy::ReleaseManager;
use deploykit::errors::DeployError;
use deploykit::models::release::ScmKind;
use deploykit::services::{
    Accounts, CommandOutput, CommandRunner, LocalFileSystem, Scm, Services,
};

pub const USER: &str = "deploy";
pub const REPOSITORY: &str = "https://example.com/app.git";

/// One command the runner saw
#[derive(Debug, Clone)]
pub struct Invocation {
    pub cmd: String,
    pub cwd: PathBuf,
    pub user: Option<String>,
}

/// Command runner answering from scripted outputs
///
/// The first rule whose pattern is contained in the command wins; anything
/// unmatched succeeds with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<(String, CommandOutput)>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn script(&self, pattern: &str, exit_code: i32, stdout: &str) {
        self.rules.lock().unwrap().insert(
            0,
            (
                pattern.to_string(),
                CommandOutput {
                    exit_code,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            ),
        );
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.invocations().iter().any(|i| i.cmd.contains(pattern))
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        cmd: &str,
        cwd: &Path,
        user: Option<&str>,
    ) -> Result<CommandOutput, DeployError> {
        self.invocations.lock().unwrap().push(Invocation {
            cmd: cmd.to_string(),
            cwd: cwd.to_path_buf(),
            user: user.map(str::to_string),
        });

        let rules = self.rules.lock().unwrap();
        Ok(rules
            .iter()
            .find(|(pattern, _)| cmd.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }
}

/// SCM that "clones" by creating a directory
#[derive(Default)]
pub struct FakeScm {
    checkouts: Mutex<HashMap<PathBuf, String>>,
    clones: Mutex<usize>,
    fetches: Mutex<usize>,

    /// Files or directories every clone ships with
    pub shipped: Mutex<Vec<&'static str>>,
}

impl FakeScm {
    pub fn clones(&self) -> usize {
        *self.clones.lock().unwrap()
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    pub fn ship(&self, name: &'static str) {
        self.shipped.lock().unwrap().push(name);
    }
}

#[async_trait]
impl Scm for FakeScm {
    fn kind(&self) -> ScmKind {
        ScmKind::Git
    }

    async fn clone_repository(
        &self,
        dest: &Path,
        _url: &str,
        _user: Option<&str>,
    ) -> Result<(), DeployError> {
        std::fs::create_dir(dest)?;
        std::fs::write(dest.join("README"), "app\n")?;
        for name in self.shipped.lock().unwrap().iter() {
            std::fs::create_dir(dest.join(name))?;
        }
        *self.clones.lock().unwrap() += 1;
        Ok(())
    }

    async fn checkout(
        &self,
        dest: &Path,
        rev: &str,
        force: bool,
        _user: Option<&str>,
    ) -> Result<(), DeployError> {
        assert!(force, "deploys always force the checkout");
        self.checkouts
            .lock()
            .unwrap()
            .insert(dest.to_path_buf(), rev.to_string());
        Ok(())
    }

    async fn current_revision(
        &self,
        dest: &Path,
        _user: Option<&str>,
    ) -> Result<String, DeployError> {
        let rev = self
            .checkouts
            .lock()
            .unwrap()
            .get(dest)
            .cloned()
            .unwrap_or_else(|| "HEAD".to_string());
        Ok(format!("commit-{}", rev))
    }

    async fn fetch_remote(&self, _dest: &Path, _user: Option<&str>) -> Result<(), DeployError> {
        *self.fetches.lock().unwrap() += 1;
        Ok(())
    }
}

/// Every name resolves to the ids owning the test directory
pub struct FixedAccounts {
    pub uid: u32,
    pub gid: u32,
}

impl Accounts for FixedAccounts {
    fn user_to_uid(&self, _user: &str) -> Result<u32, DeployError> {
        Ok(self.uid)
    }

    fn group_to_gid(&self, _group: &str) -> Result<u32, DeployError> {
        Ok(self.gid)
    }

    fn uid_to_user(&self, _uid: u32) -> Result<String, DeployError> {
        Ok(USER.to_string())
    }

    fn gid_to_group(&self, _gid: u32) -> Result<String, DeployError> {
        Ok(USER.to_string())
    }
}

/// An application root with fake collaborators
pub struct TestApp {
    pub dir: tempfile::TempDir,
    pub root: PathBuf,
    pub manager: ReleaseManager,
    pub services: Services,
    pub runner: Arc<ScriptedRunner>,
    pub scm: Arc<FakeScm>,
}

impl TestApp {
    /// A root without any directories created
    pub fn bare() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let meta = std::fs::metadata(dir.path()).unwrap();
        let root = dir.path().join("app");

        let runner = Arc::new(ScriptedRunner::default());
        let scm = Arc::new(FakeScm::default());
        let accounts: Arc<dyn Accounts> = Arc::new(FixedAccounts {
            uid: meta.uid(),
            gid: meta.gid(),
        });
        let services = Services {
            commands: runner.clone(),
            scm: scm.clone(),
            fs: Arc::new(LocalFileSystem::new(accounts.clone())),
            accounts,
        };

        Self {
            manager: ReleaseManager::new(&root, services.clone()),
            services,
            dir,
            root,
            runner,
            scm,
        }
    }

    /// A root with its skeleton in place
    pub async fn new() -> Self {
        let app = Self::bare();
        app.manager
            .skeleton(&SkeletonOptions::default())
            .await
            .unwrap();
        app
    }

    pub fn request(&self, tag: &str) -> DeployRequest {
        DeployRequest {
            repository: REPOSITORY.to_string(),
            tag: Some(tag.parse().unwrap()),
            ..Default::default()
        }
    }

    /// Deploy a release whose deploy hook succeeds
    pub async fn deploy_ok(&self, tag: &str) {
        self.manager.deploy(&self.request(tag)).await.unwrap();
    }

    /// Deploy a release whose deploy hook fails
    pub async fn deploy_failing(&self, tag: &str) {
        self.runner.script("exit-failure", 1, "");
        let request = DeployRequest {
            deploy_cmd: Some("./build exit-failure".to_string()),
            ..self.request(tag)
        };
        self.manager.deploy(&request).await.unwrap_err();
    }

    pub async fn current_tag(&self) -> Option<String> {
        self.manager
            .current()
            .await
            .unwrap()
            .map(|release| release.tag.to_string())
    }

    pub fn release_path(&self, tag: &str) -> PathBuf {
        self.root.join("releases").join(tag)
    }

    pub fn tag(tag: &str) -> ReleaseTag {
        tag.parse().unwrap()
    }
}
