use std::collections::BTreeSet;
use std::process::Command;

/// Snapshot of `git status --porcelain` entries. Any failure (not a
/// repository, git missing) yields an empty set — the summary simply
/// shows no changed files.
pub fn status_snapshot() -> BTreeSet<String> {
    let output = match Command::new("git").args(["status", "--porcelain"]).output() {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            tracing::debug!(status = %output.status, "git status failed");
            return BTreeSet::new();
        }
        Err(err) => {
            tracing::debug!(%err, "git unavailable");
            return BTreeSet::new();
        }
    };
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Entries present after the run but not before, sorted.
pub fn diff_files(before: &BTreeSet<String>, after: &BTreeSet<String>) -> Vec<String> {
    after.difference(before).cloned().collect()
}
