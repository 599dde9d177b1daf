//! Stamps the binary with the source revision and build date reported by
//! `deploykit --version`

use std::process::Command;

use chrono::Utc;

const UNKNOWN: &str = "unknown";

/// Short hash of the checked-out commit, if this is a git checkout
fn source_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let revision = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!revision.is_empty()).then_some(revision)
}

fn main() {
    let revision = source_revision().unwrap_or_else(|| UNKNOWN.to_string());
    let built_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    println!("cargo:rustc-env=DEPLOYKIT_REVISION={}", revision);
    println!("cargo:rustc-env=DEPLOYKIT_BUILT_AT={}", built_at);

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
