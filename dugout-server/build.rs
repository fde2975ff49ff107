//! Stamps the server binary with its build identity
//!
//! `main` prints these at startup so a running instance can be matched to a
//! commit. No `rerun-if-changed` is emitted, so the script reruns every build.

use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Short commit hash of the checkout, if built from one
fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_owned()).filter(|h| !h.is_empty())
}

fn set_env(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

fn main() {
    let hash = commit_hash().unwrap_or_else(|| UNKNOWN.to_owned());
    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_owned());

    set_env("GIT_HASH", &hash);
    set_env("BUILD_TIMESTAMP", &built_at);
    set_env("BUILD_PROFILE", &profile);
}
