//! Build script for shellac-repl.
//!
//! Stamps the demo binary with the commit, build date and profile so
//! `shellac-demo --version` can say exactly what is running.

use std::process::Command;

/// Run git and return its trimmed stdout, if it worked.
fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
}

fn main() {
    // Source tarballs have no .git to watch.
    if std::path::Path::new("../../.git").exists() {
        println!("cargo::rerun-if-changed=../../.git/HEAD");
        println!("cargo::rerun-if-changed=../../.git/refs/heads/");
    }

    let mut commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    if git(&["status", "--porcelain", "--untracked-files=no"]).is_some() {
        commit.push_str("-dirty");
    }

    let build_date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=SHELLAC_GIT_HASH={commit}");
    println!("cargo:rustc-env=SHELLAC_BUILD_DATE={build_date}");
    println!("cargo:rustc-env=SHELLAC_BUILD_PROFILE={profile}");
}
