//! Release manager
//!
//! One application root plus the collaborators used to act on it. Callers
//! must not run two mutating operations against the same root at once;
//! nothing here locks.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::deploy::deployer::{self, DeployRequest};
use crate::deploy::reconcile::{self, EnsureOutcome, EnsureRequest};
use crate::deploy::skeleton::{self, SkeletonOptions};
use crate::deploy::tag::ReleaseTag;
use crate::deploy::{catalog, navigator, pointer, retention};
use crate::errors::DeployError;
use crate::models::release::Release;
use crate::services::Services;
use crate::storage::layout::AppLayout;

/// Operations on one application root
#[derive(Clone)]
pub struct ReleaseManager {
    layout: AppLayout,
    services: Services,
}

impl ReleaseManager {
    pub fn new(root: impl Into<PathBuf>, services: Services) -> Self {
        Self {
            layout: AppLayout::new(root),
            services,
        }
    }

    pub fn layout(&self) -> &AppLayout {
        &self.layout
    }

    /// Create the application directory structure
    pub async fn skeleton(
        &self,
        options: &SkeletonOptions,
    ) -> Result<BTreeMap<PathBuf, String>, DeployError> {
        skeleton::skeleton(&self.layout, &self.services, options).await
    }

    /// Deploy a new release and make it current
    pub async fn deploy(&self, request: &DeployRequest) -> Result<Release, DeployError> {
        deployer::deploy(&self.layout, &self.services, request).await
    }

    /// Select the nearest successful release before current
    pub async fn rollback(&self) -> Result<Release, DeployError> {
        navigator::rollback(&self.layout).await
    }

    /// Select the nearest successful release after current
    pub async fn rollforward(&self) -> Result<Release, DeployError> {
        navigator::rollforward(&self.layout).await
    }

    /// The current release, if any
    pub async fn current(&self) -> Result<Option<Release>, DeployError> {
        catalog::current(&self.layout).await
    }

    /// All releases, ascending by tag
    pub async fn available(&self) -> Result<Vec<Release>, DeployError> {
        catalog::list(&self.layout).await
    }

    /// All releases with the current one flagged
    pub async fn status(&self) -> Result<Vec<Release>, DeployError> {
        catalog::status(&self.layout).await
    }

    /// Remove old non-current releases beyond the newest `keep`
    pub async fn limit_history(&self, keep: usize) -> Result<Vec<Release>, DeployError> {
        retention::limit_history(&self.layout, &self.services, keep).await
    }

    /// Point `current` at a release
    pub async fn select(&self, tag: &ReleaseTag) -> Result<Release, DeployError> {
        pointer::select(&self.layout, tag).await
    }

    /// Deploy only if the current release does not satisfy `request`
    pub async fn ensure(&self, request: &EnsureRequest) -> Result<EnsureOutcome, DeployError> {
        reconcile::ensure(&self.layout, &self.services, request).await
    }
}
