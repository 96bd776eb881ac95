//! Test helpers for integration tests

use anyhow::{Context, Result};
use bundle_rail::release::name::RELEASE_ENV_VARS;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway project directory
pub struct TestProject {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestProject {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    Ok(Self { _root: root, path })
  }

  /// Initialize a git repository with one commit, returning the HEAD SHA
  pub fn init_git(&self) -> Result<String> {
    git(&self.path, &["init", "--initial-branch=main"])?;
    git(&self.path, &["config", "user.name", "Test User"])?;
    git(&self.path, &["config", "user.email", "test@example.com"])?;
    self.write("README.md", "# test\n")?;
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", "Initial commit"])?;

    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Write a file, creating parent directories
  pub fn write(&self, path: &str, content: &str) -> Result<PathBuf> {
    let full = self.path.join(path);
    if let Some(parent) = full.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&full, content).with_context(|| format!("Failed to write {}", full.display()))?;
    Ok(full)
  }

  pub fn read(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Install a stand-in release CLI that appends its arguments to `cli.log`
  ///
  /// Invocations whose arguments contain `fail_on` exit non-zero.
  #[cfg(unix)]
  pub fn fake_cli(&self, fail_on: Option<&str>) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let log = self.path.join("cli.log");
    let failure = fail_on
      .map(|pattern| {
        format!(
          "case \"$*\" in *{}*) echo \"{} rejected\" >&2; exit 1;; esac\n",
          pattern, pattern
        )
      })
      .unwrap_or_default();
    let script = format!(
      "#!/bin/sh\necho \"[$SENTRY_ORG] $*\" >> \"{}\"\n{}exit 0\n",
      log.display(),
      failure
    );

    let path = self.write("fake-cli.sh", &script)?;
    let mut perms = std::fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms)?;
    Ok(path)
  }

  /// Lines the fake CLI logged, without the org prefix
  pub fn cli_calls(&self) -> Result<Vec<String>> {
    if !self.file_exists("cli.log") {
      return Ok(Vec::new());
    }
    Ok(
      self
        .read("cli.log")?
        .lines()
        .map(|l| l.split_once("] ").map(|(_, rest)| rest).unwrap_or(l).to_string())
        .collect(),
    )
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run bundle-rail without judging its exit status
///
/// CI release variables are cleared so release names only come from the test itself.
pub fn run_bundle_rail_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  let mut cmd = Command::new(env!("CARGO_BIN_EXE_bundle-rail"));
  cmd.current_dir(cwd).args(args);
  for key in RELEASE_ENV_VARS {
    cmd.env_remove(key);
  }
  cmd.output().context("Failed to run bundle-rail")
}

/// Run bundle-rail, failing on a non-zero exit
pub fn run_bundle_rail(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_bundle_rail_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "bundle-rail command failed: bundle-rail {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Parse a command's stdout as JSON
pub fn stdout_json(output: &Output) -> Result<serde_json::Value> {
  serde_json::from_slice(&output.stdout).context("stdout is not valid JSON")
}
