//! Release pipeline orchestration
//!
//! The remote side of a build runs as a fixed sequence of steps:
//!
//! 1. **create** the release (fatal on failure)
//! 2. **clean artifacts** uploaded earlier under the same name
//! 3. **upload source maps**
//! 4. **associate commits**
//! 5. **finalize** the release
//! 6. **deploy** record
//!
//! Steps are descriptors in [`STEPS`]; one runner walks the table. Every failure goes
//! through the [`ErrorSink`], so the same table serves hosts that abort and hosts that
//! only report.

use crate::core::config::ReleaseConfig;
use crate::core::error::{BundleError, BundleResult, ConfigError, StepError};
use crate::release::backend::{ReleaseBackend, SourceMapUpload, UploadGroup};
use crate::release::sink::ErrorSink;
use crate::upload::walk::collect_files;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Instant;

/// Remote operation performed by one pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
  Create,
  CleanArtifacts,
  UploadSourceMaps,
  SetCommits,
  Finalize,
  Deploy,
}

impl fmt::Display for StepKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      StepKind::Create => "create",
      StepKind::CleanArtifacts => "clean artifacts",
      StepKind::UploadSourceMaps => "upload source maps",
      StepKind::SetCommits => "associate commits",
      StepKind::Finalize => "finalize",
      StepKind::Deploy => "deploy",
    };
    write!(f, "{}", name)
  }
}

/// Whether later steps may run after this one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureClass {
  Fatal,
  Recoverable,
}

/// One row of the step table
#[derive(Debug, Clone, Copy)]
pub struct StepDescriptor {
  pub kind: StepKind,
  pub class: FailureClass,
  pub enabled: fn(&ReleaseConfig) -> bool,
}

/// Step table, in execution order
pub const STEPS: [StepDescriptor; 6] = [
  StepDescriptor {
    kind: StepKind::Create,
    class: FailureClass::Fatal,
    enabled: |c| c.create,
  },
  StepDescriptor {
    kind: StepKind::CleanArtifacts,
    class: FailureClass::Recoverable,
    enabled: |c| c.clean_artifacts,
  },
  StepDescriptor {
    kind: StepKind::UploadSourceMaps,
    class: FailureClass::Recoverable,
    enabled: |c| !c.uploads.is_empty(),
  },
  StepDescriptor {
    kind: StepKind::SetCommits,
    class: FailureClass::Recoverable,
    enabled: |c| c.set_commits.is_some(),
  },
  StepDescriptor {
    kind: StepKind::Finalize,
    class: FailureClass::Recoverable,
    enabled: |c| c.finalize,
  },
  StepDescriptor {
    kind: StepKind::Deploy,
    class: FailureClass::Recoverable,
    enabled: |c| c.deploy.is_some(),
  },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Completed,
  /// Disabled by configuration
  Skipped,
  Failed,
  /// Not attempted because an earlier fatal step failed
  NotRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
  pub step: StepKind,
  pub status: StepStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
}

impl StepRecord {
  fn new(step: StepKind, status: StepStatus) -> Self {
    Self {
      step,
      status,
      error: None,
      duration_ms: None,
    }
  }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
  pub release: Option<String>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub steps: Vec<StepRecord>,
  /// A fatal or pre-flight failure stopped the run
  pub aborted: bool,
}

impl PipelineReport {
  fn new(release: Option<String>) -> Self {
    let now = Utc::now();
    Self {
      release,
      started_at: now,
      finished_at: now,
      steps: Vec::with_capacity(STEPS.len()),
      aborted: false,
    }
  }

  /// Steps that were attempted, in order
  pub fn executed(&self) -> Vec<StepKind> {
    self
      .steps
      .iter()
      .filter(|r| matches!(r.status, StepStatus::Completed | StepStatus::Failed))
      .map(|r| r.step)
      .collect()
  }

  pub fn status_of(&self, step: StepKind) -> Option<StepStatus> {
    self.steps.iter().find(|r| r.step == step).map(|r| r.status)
  }

  pub fn has_failures(&self) -> bool {
    self.aborted || self.steps.iter().any(|r| r.status == StepStatus::Failed)
  }

  fn abort_remaining(mut self) -> Self {
    let recorded = self.steps.len();
    self.steps.extend(
      STEPS[recorded..]
        .iter()
        .map(|d| StepRecord::new(d.kind, StepStatus::NotRun)),
    );
    self.aborted = true;
    self.finished_at = Utc::now();
    self
  }
}

/// Runs the step table for one release
pub struct ReleasePipeline<'a> {
  release: Option<String>,
  config: &'a ReleaseConfig,
  base_dir: PathBuf,
}

impl<'a> ReleasePipeline<'a> {
  /// `base_dir` anchors relative upload paths
  pub fn new(release: Option<String>, config: &'a ReleaseConfig, base_dir: impl Into<PathBuf>) -> Self {
    Self {
      release,
      config,
      base_dir: base_dir.into(),
    }
  }

  /// Run every enabled step in order
  ///
  /// Returns `Err` only when the sink raises. Under a delegating sink the report
  /// carries every failure instead.
  pub fn run(&self, backend: &dyn ReleaseBackend, sink: &ErrorSink) -> BundleResult<PipelineReport> {
    let mut report = PipelineReport::new(self.release.clone());

    if let Err(e) = self.config.validate() {
      sink.handle(e)?;
      return Ok(report.abort_remaining());
    }
    let Some(release) = self.release.as_deref() else {
      sink.handle(ConfigError::ReleaseNameUnresolved)?;
      return Ok(report.abort_remaining());
    };

    for descriptor in &STEPS {
      if !(descriptor.enabled)(self.config) {
        tracing::debug!(step = %descriptor.kind, "step disabled");
        report.steps.push(StepRecord::new(descriptor.kind, StepStatus::Skipped));
        continue;
      }

      let started = Instant::now();
      let outcome = self.execute(descriptor.kind, release, backend);
      let duration_ms = Some(started.elapsed().as_millis() as u64);

      match outcome {
        Ok(()) => {
          tracing::info!(step = %descriptor.kind, release, "step completed");
          report.steps.push(StepRecord {
            duration_ms,
            ..StepRecord::new(descriptor.kind, StepStatus::Completed)
          });
        }
        Err(cause) => {
          let error = BundleError::Step(StepError::new(descriptor.kind, release, cause));
          tracing::warn!(step = %descriptor.kind, release, error = %error, "step failed");
          report.steps.push(StepRecord {
            error: Some(error.to_string()),
            duration_ms,
            ..StepRecord::new(descriptor.kind, StepStatus::Failed)
          });

          sink.handle(error)?;
          if descriptor.class == FailureClass::Fatal {
            return Ok(report.abort_remaining());
          }
        }
      }
    }

    report.finished_at = Utc::now();
    Ok(report)
  }

  /// Run one step, turning a panicking backend into an ordinary failure
  fn execute(&self, kind: StepKind, release: &str, backend: &dyn ReleaseBackend) -> BundleResult<()> {
    panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(kind, release, backend)))
      .unwrap_or_else(|payload| Err(BundleError::unknown(payload)))
  }

  fn dispatch(&self, kind: StepKind, release: &str, backend: &dyn ReleaseBackend) -> BundleResult<()> {
    tracing::debug!(step = %kind, release, "calling release backend");
    match kind {
      StepKind::Create => backend.create_release(release),
      StepKind::CleanArtifacts => backend.delete_artifacts(release),
      StepKind::UploadSourceMaps => self.upload(release, backend),
      StepKind::SetCommits => match &self.config.set_commits {
        Some(commits) => backend.set_commits(release, commits),
        None => Ok(()),
      },
      StepKind::Finalize => backend.finalize(release),
      StepKind::Deploy => match &self.config.deploy {
        Some(deploy) => backend.add_deploy(release, deploy),
        None => Ok(()),
      },
    }
  }

  fn upload(&self, release: &str, backend: &dyn ReleaseBackend) -> BundleResult<()> {
    let mut groups = Vec::new();
    for include in &self.config.uploads {
      let files = collect_files(&self.base_dir, &include.paths, &include.ignore, &include.ext)?;
      if files.is_empty() {
        tracing::warn!(paths = ?include.paths, "no files found to upload");
        continue;
      }
      groups.push(UploadGroup {
        files,
        url_prefix: include.url_prefix.clone(),
      });
    }

    if groups.is_empty() {
      return Ok(());
    }

    backend.upload_source_maps(
      release,
      &SourceMapUpload {
        dist: self.config.dist.clone(),
        groups,
      },
    )
  }
}
