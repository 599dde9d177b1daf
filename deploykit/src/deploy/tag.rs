//! Release tags
//!
//! A tag names a directory under `releases/`. The catalog orders releases
//! by comparing tags as strings, so generated tags are fixed-width UTC
//! timestamps whose lexicographic order is their chronological order.
//! Caller-supplied tags are accepted as long as they are valid directory
//! names, but they forfeit that ordering guarantee.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Format of generated tags, one-second resolution
pub const TAG_FORMAT: &str = "%Y%m%d%H%M%S";

const MAX_TAG_LEN: usize = 128;

/// A validated release tag
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// Generate a tag from the current time
    pub fn generate() -> Self {
        Self::generate_at(&Utc::now())
    }

    /// Generate a tag for a given instant, rendered in UTC whatever the
    /// zone of `at`
    pub fn generate_at<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self(at.with_timezone(&Utc).format(TAG_FORMAT).to_string())
    }

    /// Validate a caller-supplied tag
    pub fn new(tag: impl Into<String>) -> Result<Self, DeployError> {
        let tag = tag.into();
        validate(&tag)?;
        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this tag has the generated timestamp shape
    pub fn is_timestamp(&self) -> bool {
        self.0.len() == 14 && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

fn validate(tag: &str) -> Result<(), DeployError> {
    if tag.is_empty() {
        return Err(DeployError::InvalidTag("tag is empty".to_string()));
    }
    if tag.len() > MAX_TAG_LEN {
        return Err(DeployError::InvalidTag(format!(
            "tag is longer than {} characters",
            MAX_TAG_LEN
        )));
    }
    if tag == "." || tag == ".." {
        return Err(DeployError::InvalidTag(format!("{:?} is not a release name", tag)));
    }
    if let Some(c) = tag
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(DeployError::InvalidTag(format!(
            "{:?} contains invalid character {:?}",
            tag, c
        )));
    }
    Ok(())
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReleaseTag {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ReleaseTag {
    type Error = DeployError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReleaseTag> for String {
    fn from(tag: ReleaseTag) -> Self {
        tag.0
    }
}

impl AsRef<str> for ReleaseTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
