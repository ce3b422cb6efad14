//! Dataset synchronisation
//!
//! Keeps a local checkout of the country CIDR repository up to date by
//! running the `git` executable: clone when the directory is missing, pull
//! otherwise. Failures are reported to the caller, who normally logs them and
//! carries on with whatever tree is already on disk.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

/// What a sync did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Cloned,
    Pulled,
}

/// Clone `url` into `dir`, or pull if `dir` already holds a checkout
pub fn sync_dataset(url: &str, dir: &Path) -> Result<SyncOutcome> {
    if dir.join(".git").exists() {
        info!("pulling dataset updates in {}", dir.display());
        run_git(&["pull", "--ff-only", "origin"], Some(dir))?;
        Ok(SyncOutcome::Pulled)
    } else {
        if dir.exists() && dir.read_dir().map(|mut d| d.next().is_some()).unwrap_or(false) {
            return Err(anyhow!(
                "{} exists and is not a git checkout, refusing to clone into it",
                dir.display()
            ));
        }
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create {}", parent.display()))?;
        }
        info!("cloning dataset {} into {}", url, dir.display());
        let target = dir.to_string_lossy().to_string();
        run_git(&["clone", "--depth", "1", url, target.as_str()], None)?;
        Ok(SyncOutcome::Cloned)
    }
}

/// Sync, logging instead of failing
pub fn sync_dataset_logged(url: &str, dir: &Path) -> Option<SyncOutcome> {
    match sync_dataset(url, dir) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!("dataset sync failed, using existing tree: {:#}", e);
            None
        }
    }
}

fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd
        .output()
        .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        return Err(anyhow!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refuses_to_clone_into_populated_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("us.txt"), "8.0.0.0/8\n").unwrap();

        let res = sync_dataset("https://example.invalid/repo.git", dir.path());
        assert!(res.is_err());
        // the existing tree is untouched
        assert!(dir.path().join("us.txt").exists());
    }

    #[test]
    fn test_logged_sync_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("us.txt"), "8.0.0.0/8\n").unwrap();
        assert!(sync_dataset_logged("https://example.invalid/repo.git", dir.path()).is_none());
    }
}
