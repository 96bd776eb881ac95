//! Release backend driving the release-management CLI
//!
//! Credentials travel through the child environment only, never on the command line.

use crate::core::config::{CliConfig, DeployConfig, SetCommitsConfig};
use crate::core::error::{BundleResult, RemoteError, ResultExt};
use crate::release::backend::{ReleaseBackend, SourceMapUpload, UploadGroup};
use std::io;
use std::path::PathBuf;
use std::process::Command;

pub struct CliBackend {
  config: CliConfig,
  working_dir: PathBuf,
}

impl CliBackend {
  pub fn new(config: CliConfig, working_dir: impl Into<PathBuf>) -> Self {
    Self {
      config,
      working_dir: working_dir.into(),
    }
  }

  fn run(&self, args: Vec<String>) -> BundleResult<()> {
    let rendered = format!("{} {}", self.config.binary, args.join(" "));
    tracing::debug!(command = %rendered, "running release cli");

    let mut cmd = Command::new(&self.config.binary);
    cmd.args(&args).current_dir(&self.working_dir);
    for (key, value) in [
      ("SENTRY_ORG", &self.config.org),
      ("SENTRY_PROJECT", &self.config.project),
      ("SENTRY_URL", &self.config.url),
      ("SENTRY_AUTH_TOKEN", &self.config.auth_token),
    ] {
      if let Some(value) = value {
        cmd.env(key, value);
      }
    }

    let output = match cmd.output() {
      Ok(output) => output,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        return Err(
          RemoteError::BinaryNotFound {
            binary: self.config.binary.clone(),
          }
          .into(),
        );
      }
      Err(e) => return Err(e).with_context(|| format!("Failed to run {}", rendered)),
    };

    if !output.status.success() {
      return Err(
        RemoteError::CommandFailed {
          command: rendered,
          stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
        .into(),
      );
    }
    Ok(())
  }
}

impl ReleaseBackend for CliBackend {
  fn create_release(&self, release: &str) -> BundleResult<()> {
    self.run(create_args(release))
  }

  fn delete_artifacts(&self, release: &str) -> BundleResult<()> {
    self.run(delete_artifacts_args(release))
  }

  fn upload_source_maps(&self, release: &str, upload: &SourceMapUpload) -> BundleResult<()> {
    for group in &upload.groups {
      self.run(upload_args(release, upload.dist.as_deref(), group))?;
    }
    Ok(())
  }

  fn set_commits(&self, release: &str, commits: &SetCommitsConfig) -> BundleResult<()> {
    self.run(set_commits_args(release, commits))
  }

  fn finalize(&self, release: &str) -> BundleResult<()> {
    self.run(finalize_args(release))
  }

  fn add_deploy(&self, release: &str, deploy: &DeployConfig) -> BundleResult<()> {
    self.run(deploy_args(release, deploy))
  }
}

fn args(parts: &[&str]) -> Vec<String> {
  parts.iter().map(|s| s.to_string()).collect()
}

pub fn create_args(release: &str) -> Vec<String> {
  args(&["releases", "new", release])
}

pub fn delete_artifacts_args(release: &str) -> Vec<String> {
  args(&["releases", "files", release, "delete", "--all"])
}

pub fn upload_args(release: &str, dist: Option<&str>, group: &UploadGroup) -> Vec<String> {
  let mut out = args(&["releases", "files", release, "upload-sourcemaps"]);
  out.extend(group.files.iter().map(|f| f.to_string_lossy().to_string()));
  if let Some(dist) = dist {
    out.extend(args(&["--dist", dist]));
  }
  if let Some(prefix) = &group.url_prefix {
    out.extend(args(&["--url-prefix", prefix]));
  }
  out
}

/// Arguments for associating commits
///
/// An explicit range is `repo@previous..commit`, or `repo@commit` without a previous
/// commit.
pub fn set_commits_args(release: &str, commits: &SetCommitsConfig) -> Vec<String> {
  let mut out = args(&["releases", "set-commits", release]);
  if commits.auto {
    out.push("--auto".to_string());
  } else if let (Some(repo), Some(commit)) = (&commits.repo, &commits.commit) {
    let spec = match &commits.previous_commit {
      Some(previous) => format!("{}@{}..{}", repo, previous, commit),
      None => format!("{}@{}", repo, commit),
    };
    out.extend(["--commit".to_string(), spec]);
  }
  if commits.ignore_missing {
    out.push("--ignore-missing".to_string());
  }
  if commits.ignore_empty {
    out.push("--ignore-empty".to_string());
  }
  out
}

pub fn finalize_args(release: &str) -> Vec<String> {
  args(&["releases", "finalize", release])
}

pub fn deploy_args(release: &str, deploy: &DeployConfig) -> Vec<String> {
  let mut out = args(&["releases", "deploys", release, "new", "--env", &deploy.env]);
  for (flag, value) in [
    ("--started", deploy.started.map(|v| v.to_string())),
    ("--finished", deploy.finished.map(|v| v.to_string())),
    ("--time", deploy.time.map(|v| v.to_string())),
    ("--name", deploy.name.clone()),
    ("--url", deploy.url.clone()),
  ] {
    if let Some(value) = value {
      out.extend([flag.to_string(), value]);
    }
  }
  out
}
