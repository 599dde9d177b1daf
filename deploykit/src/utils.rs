//! Utility functions

use serde::{Deserialize, Serialize};

/// Build metadata printed by `deploykit --version`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,

    /// Short commit hash, or `unknown` outside a git checkout
    pub revision: String,
    pub built_at: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        revision: option_env!("DEPLOYKIT_REVISION")
            .filter(|r| !r.is_empty())
            .unwrap_or("unknown")
            .to_string(),
        built_at: option_env!("DEPLOYKIT_BUILT_AT")
            .unwrap_or("unknown")
            .to_string(),
    }
}
