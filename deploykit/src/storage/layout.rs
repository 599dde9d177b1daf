//! Application root layout
//!
//! ```text
//! <root>/releases/<tag>/META
//! <root>/shared/{log,pids,system,tmp,session}/
//! <root>/current -> releases/<tag>
//! ```

use std::path::{Path, PathBuf};

use crate::deploy::tag::ReleaseTag;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::filesys::link::Link;

/// Subdirectories of `shared/` that persist across releases
pub const SHARED_DIRS: [&str; 5] = ["log", "pids", "system", "tmp", "session"];

/// Name of the per-release metadata file
pub const META_FILE: &str = "META";

/// Directory layout of one application root
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// The application root
    pub root: PathBuf,
}

impl AppLayout {
    /// Create a layout for `root`, dropping any trailing slash
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        Self {
            root: root.components().collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_dir(&self) -> Dir {
        Dir::new(&self.root)
    }

    /// Get the releases directory
    pub fn releases_dir(&self) -> Dir {
        Dir::new(self.root.join("releases"))
    }

    /// Get the directory of one release
    pub fn release_dir(&self, tag: &ReleaseTag) -> Dir {
        self.releases_dir().subdir(tag.as_str())
    }

    /// Get the metadata file of one release
    pub fn meta_file(&self, tag: &ReleaseTag) -> File {
        self.release_dir(tag).file(META_FILE)
    }

    /// Get the shared directory
    pub fn shared_dir(&self) -> Dir {
        Dir::new(self.root.join("shared"))
    }

    /// Get the shared log directory
    pub fn shared_log_dir(&self) -> Dir {
        self.shared_dir().subdir("log")
    }

    /// Get the `current` pointer
    pub fn current_link(&self) -> Link {
        Link::new(self.root.join("current"))
    }

    /// Target of `current` for a release, relative to the root
    pub fn current_target(tag: &ReleaseTag) -> PathBuf {
        Path::new("releases").join(tag.as_str())
    }

    /// Target of a release's `log` link, relative to the release directory
    pub fn release_log_target() -> PathBuf {
        Path::new("..").join("..").join("shared").join("log")
    }

    /// Every directory of a complete skeleton, parents first
    pub fn skeleton_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.root.clone(),
            self.releases_dir().path().to_path_buf(),
            self.shared_dir().path().to_path_buf(),
        ];
        dirs.extend(
            SHARED_DIRS
                .iter()
                .map(|name| self.shared_dir().path().join(name)),
        );
        dirs
    }
}
