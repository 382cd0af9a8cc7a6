// Build label for --version: `git describe` output plus the cargo profile.
// Outside a git checkout the label is just the profile.
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_owned());
    let label = match describe() {
        Some(revision) => format!("{revision} ({profile})"),
        None => format!("({profile})"),
    };
    println!("cargo:rustc-env=CORTEX_SPLASH_BUILD={label}");
}

fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let revision = String::from_utf8(output.stdout).ok()?;
    let revision = revision.trim();
    (!revision.is_empty()).then(|| revision.to_owned())
}
