//! System git backend
//!
//! Shells out to the `git` binary with an isolated environment. Only the handful of
//! plumbing queries release naming needs are exposed.

use crate::core::error::{BundleError, BundleResult, ResultExt, VcsError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git
#[derive(Debug, Clone)]
pub struct SystemGit {
  /// Directory git commands run in
  repo_path: PathBuf,
}

impl SystemGit {
  /// Open the repository containing `path`
  pub fn open(path: &Path) -> BundleResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(BundleError::Vcs(VcsError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(BundleError::message(format!("Failed to open git repository: {}", stderr)));
    }

    Ok(Self {
      repo_path: path.to_path_buf(),
    })
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> BundleResult<String> {
    self.query(&["rev-parse", "HEAD"])
  }

  fn query(&self, args: &[&str]) -> BundleResult<String> {
    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
      return Err(BundleError::Vcs(VcsError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Git command with an isolated environment
  ///
  /// Only PATH and HOME survive, so user config cannot change plumbing output.
  fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(&self.repo_path);

    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false");
    cmd
  }
}
