//! Release models

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::deploy::tag::ReleaseTag;

/// Source-control kind a release was checked out with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    #[default]
    Git,
}

/// The record persisted as `releases/<tag>/META`
///
/// Only what the deploy attempt produced is stored. The tag and path of a
/// release are derived from its location and live on [`Release`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMeta {
    /// Resolved revision id of the checkout
    #[serde(default)]
    pub commit: Option<String>,

    /// Requested revision or branch
    #[serde(default)]
    pub rev: Option<String>,

    #[serde(default)]
    pub scm: ScmKind,

    /// Outcome of `deploy_cmd`; `None` when no deploy command was given
    #[serde(default)]
    pub deploy_cmd_ok: Option<bool>,

    /// Outcome of `test_cmd`; `None` when no test command was given
    #[serde(default)]
    pub test_cmd_ok: Option<bool>,

    /// Overall success of the deploy attempt
    #[serde(default)]
    pub ok: bool,
}

impl ReleaseMeta {
    /// A fresh record for a deploy attempt of `rev`
    pub fn new(rev: Option<String>, scm: ScmKind) -> Self {
        Self {
            rev,
            scm,
            ..Default::default()
        }
    }
}

/// A release as seen at read time: its stored record merged with the
/// derived tag and path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub tag: ReleaseTag,

    pub path: PathBuf,

    /// `None` when no `META` file exists (unknown or incomplete release)
    #[serde(flatten)]
    pub meta: Option<ReleaseMeta>,

    /// Whether `current` points at this release
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub current: bool,
}

impl Release {
    /// Whether the release finished its deploy successfully
    pub fn is_ok(&self) -> bool {
        self.meta.as_ref().is_some_and(|meta| meta.ok)
    }

    /// The requested revision, if a record exists
    pub fn rev(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|meta| meta.rev.as_deref())
    }
}
