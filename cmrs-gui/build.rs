use std::env;
use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
}

fn main() {
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");

    let hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| {
        println!("cargo:warning=No git checkout, building cmrs without a commit hash");
        String::from("unknown")
    });
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"]).is_some();

    let version = env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let suffix = if dirty { "-dirty" } else { "" };

    println!("cargo:rustc-env=CMRS_VERSION=cmrs {version} ({hash}{suffix})");
}
