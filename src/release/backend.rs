//! Release-management collaborator interface

use crate::core::config::{DeployConfig, SetCommitsConfig};
use crate::core::error::BundleResult;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;

/// Files of one include entry, uploaded under a common URL prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadGroup {
  pub files: Vec<PathBuf>,
  pub url_prefix: Option<String>,
}

/// Everything the upload step hands to a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMapUpload {
  pub dist: Option<String>,
  pub groups: Vec<UploadGroup>,
}

impl SourceMapUpload {
  pub fn file_count(&self) -> usize {
    self.groups.iter().map(|g| g.files.len()).sum()
  }
}

/// Remote operations the release pipeline drives
///
/// Each call either fully succeeds or reports an error. Only `create_release` is
/// required to be idempotent; the pipeline never retries.
pub trait ReleaseBackend {
  fn create_release(&self, release: &str) -> BundleResult<()>;
  fn delete_artifacts(&self, release: &str) -> BundleResult<()>;
  fn upload_source_maps(&self, release: &str, upload: &SourceMapUpload) -> BundleResult<()>;
  fn set_commits(&self, release: &str, commits: &SetCommitsConfig) -> BundleResult<()>;
  fn finalize(&self, release: &str) -> BundleResult<()>;
  fn add_deploy(&self, release: &str, deploy: &DeployConfig) -> BundleResult<()>;
}

/// Backend that records what it would do instead of doing it
#[derive(Debug, Default)]
pub struct DryRunBackend {
  operations: Mutex<Vec<String>>,
}

impl DryRunBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Operations recorded so far, oldest first
  pub fn operations(&self) -> Vec<String> {
    self.operations.lock().map(|ops| ops.clone()).unwrap_or_default()
  }

  fn record(&self, operation: String) {
    tracing::info!(operation = %operation, "dry run");
    if let Ok(mut ops) = self.operations.lock() {
      ops.push(operation);
    }
  }
}

impl ReleaseBackend for DryRunBackend {
  fn create_release(&self, release: &str) -> BundleResult<()> {
    self.record(format!("create release {}", release));
    Ok(())
  }

  fn delete_artifacts(&self, release: &str) -> BundleResult<()> {
    self.record(format!("delete all artifacts of {}", release));
    Ok(())
  }

  fn upload_source_maps(&self, release: &str, upload: &SourceMapUpload) -> BundleResult<()> {
    for group in &upload.groups {
      self.record(format!(
        "upload {} file(s) to {}{}{}",
        group.files.len(),
        release,
        group
          .url_prefix
          .as_ref()
          .map(|p| format!(" under {}", p))
          .unwrap_or_default(),
        upload.dist.as_ref().map(|d| format!(" (dist {})", d)).unwrap_or_default()
      ));
    }
    Ok(())
  }

  fn set_commits(&self, release: &str, commits: &SetCommitsConfig) -> BundleResult<()> {
    let range = if commits.auto {
      "auto".to_string()
    } else {
      format!(
        "{}@{}",
        commits.repo.as_deref().unwrap_or_default(),
        commits.commit.as_deref().unwrap_or_default()
      )
    };
    self.record(format!("associate commits ({}) with {}", range, release));
    Ok(())
  }

  fn finalize(&self, release: &str) -> BundleResult<()> {
    self.record(format!("finalize {}", release));
    Ok(())
  }

  fn add_deploy(&self, release: &str, deploy: &DeployConfig) -> BundleResult<()> {
    self.record(format!("deploy {} to {}", release, deploy.env));
    Ok(())
  }
}
