use crate::core::error::{BundleError, BundleResult, ConfigError, ResultExt};
use crate::instrument::editor::MapResolution;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for bundle-rail
/// Searched in order: bundle-rail.toml, .bundle-rail.toml, .config/bundle-rail.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleConfig {
  #[serde(default)]
  pub release: ReleaseConfig,
  #[serde(default)]
  pub injection: InjectionConfig,
  #[serde(default)]
  pub sourcemaps: SourcemapsConfig,
  #[serde(default)]
  pub cli: CliConfig,
  #[serde(default)]
  pub errors: ErrorsConfig,
}

/// Release management options
///
/// # Example
///
/// ```toml
/// [release]
/// name = "web@1.4.0"
/// clean_artifacts = true
///
/// [[release.uploads]]
/// paths = ["dist"]
/// ignore = ["**/vendor/**"]
/// url_prefix = "~/static/js"
///
/// [release.set_commits]
/// auto = true
///
/// [release.deploy]
/// env = "production"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Release name; derived from CI variables or git when absent
  #[serde(default)]
  pub name: Option<String>,

  /// Inject the release name into built modules
  #[serde(default = "default_true")]
  pub inject: bool,

  /// Create the release before anything else
  #[serde(default = "default_true")]
  pub create: bool,

  /// Mark the release finished once artifacts are up
  #[serde(default = "default_true")]
  pub finalize: bool,

  /// Delete previously uploaded artifacts of this release
  #[serde(default)]
  pub clean_artifacts: bool,

  /// Distribution tag attached to uploaded files
  #[serde(default)]
  pub dist: Option<String>,

  #[serde(default)]
  pub uploads: Vec<UploadConfig>,

  #[serde(default)]
  pub set_commits: Option<SetCommitsConfig>,

  #[serde(default)]
  pub deploy: Option<DeployConfig>,
}

fn default_true() -> bool {
  true
}

impl Default for ReleaseConfig {
  fn default() -> Self {
    Self {
      name: None,
      inject: true,
      create: true,
      finalize: true,
      clean_artifacts: false,
      dist: None,
      uploads: Vec::new(),
      set_commits: None,
      deploy: None,
    }
  }
}

/// One include entry of the upload step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
  /// Files or directories to walk
  pub paths: Vec<PathBuf>,

  /// Glob patterns excluded from the walk
  #[serde(default)]
  pub ignore: Vec<String>,

  /// Prefix prepended to uploaded file URLs (e.g. "~/static/js")
  #[serde(default)]
  pub url_prefix: Option<String>,

  /// File extensions to collect, without the dot
  #[serde(default = "default_upload_ext")]
  pub ext: Vec<String>,
}

fn default_upload_ext() -> Vec<String> {
  ["js", "cjs", "mjs", "map"].iter().map(|s| s.to_string()).collect()
}

/// Commit association options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetCommitsConfig {
  /// Let the release service discover commits from the repository integration
  #[serde(default)]
  pub auto: bool,

  /// Repository name as known to the release service
  #[serde(default)]
  pub repo: Option<String>,

  /// Newest commit of the release
  #[serde(default)]
  pub commit: Option<String>,

  /// Commit the previous release ended at
  #[serde(default)]
  pub previous_commit: Option<String>,

  #[serde(default)]
  pub ignore_missing: bool,

  #[serde(default)]
  pub ignore_empty: bool,
}

/// Deploy record options; timestamps are unix seconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
  pub env: String,
  #[serde(default)]
  pub started: Option<i64>,
  #[serde(default)]
  pub finished: Option<i64>,
  /// Deploy duration in seconds, alternative to `started`/`finished`
  #[serde(default)]
  pub time: Option<i64>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub url: Option<String>,
}

/// Build-time injection options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionConfig {
  /// Stamp rendered chunks with content-derived debug IDs
  #[serde(default = "default_true")]
  pub debug_ids: bool,

  /// Glob patterns over module ids that receive the release import (empty = all)
  #[serde(default)]
  pub release_targets: Vec<String>,

  /// Extra build metadata exposed as SENTRY_BUILD_INFO
  #[serde(default)]
  pub build_info: Option<Value>,

  /// Metadata merged into the module metadata registry of every chunk
  #[serde(default)]
  pub module_metadata: Option<Value>,

  #[serde(default)]
  pub map_resolution: MapResolution,
}

impl Default for InjectionConfig {
  fn default() -> Self {
    Self {
      debug_ids: true,
      release_targets: Vec::new(),
      build_info: None,
      module_metadata: None,
      map_resolution: MapResolution::default(),
    }
  }
}

/// Artifact selection for debug ID upload preparation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcemapsConfig {
  /// Glob patterns of built assets
  #[serde(default)]
  pub assets: Vec<String>,

  /// Glob patterns excluded from `assets`
  #[serde(default)]
  pub ignore: Vec<String>,
}

/// Release CLI invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
  #[serde(default = "default_cli_binary")]
  pub binary: String,
  #[serde(default)]
  pub org: Option<String>,
  #[serde(default)]
  pub project: Option<String>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub auth_token: Option<String>,
}

fn default_cli_binary() -> String {
  "sentry-cli".to_string()
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      binary: default_cli_binary(),
      org: None,
      project: None,
      url: None,
      auth_token: None,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicyKind {
  /// Abort on the first failure
  #[default]
  Raise,
  /// Report failures and keep going
  Report,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorsConfig {
  #[serde(default)]
  pub policy: ErrorPolicyKind,
}

impl BundleConfig {
  /// Find config file in search order: bundle-rail.toml, .bundle-rail.toml, .config/bundle-rail.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("bundle-rail.toml"),
      path.join(".bundle-rail.toml"),
      path.join(".config").join("bundle-rail.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from bundle-rail.toml (searches multiple locations)
  pub fn load(path: &Path) -> BundleResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      BundleError::Config(ConfigError::NotFound {
        search_root: path.to_path_buf(),
      })
    })?;
    Self::load_file(&config_path)
  }

  /// Load config from an explicit file
  pub fn load_file(config_path: &Path) -> BundleResult<Self> {
    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    Self::parse(&content).with_context(|| format!("Failed to load config from {}", config_path.display()))
  }

  /// Parse config text
  ///
  /// Only the TOML shape is checked here. Option values are checked by [`Self::validate`],
  /// which callers run where their error policy applies.
  pub fn parse(content: &str) -> BundleResult<Self> {
    Ok(toml_edit::de::from_str(content)?)
  }

  /// Check if config exists at the given path
  pub fn exists(path: &Path) -> bool {
    Self::find_config_path(path).is_some()
  }

  pub fn validate(&self) -> BundleResult<()> {
    self.release.validate()?;
    for pattern in &self.injection.release_targets {
      check_glob("injection.release_targets", pattern)?;
    }
    for pattern in &self.sourcemaps.assets {
      check_glob("sourcemaps.assets", pattern)?;
    }
    for pattern in &self.sourcemaps.ignore {
      check_glob("sourcemaps.ignore", pattern)?;
    }
    Ok(())
  }
}

impl ReleaseConfig {
  pub fn validate(&self) -> BundleResult<()> {
    if let Some(name) = &self.name
      && name.trim().is_empty()
    {
      return Err(invalid("release.name", "must not be empty"));
    }

    for (index, upload) in self.uploads.iter().enumerate() {
      if upload.paths.is_empty() {
        return Err(BundleError::with_help(
          format!("Upload entry #{} has no paths", index + 1),
          "Add at least one file or directory under [[release.uploads]] paths",
        ));
      }
      for pattern in &upload.ignore {
        check_glob("release.uploads.ignore", pattern)?;
      }
    }

    if let Some(commits) = &self.set_commits
      && !commits.auto
      && (commits.repo.is_none() || commits.commit.is_none())
    {
      return Err(BundleError::with_help(
        "Invalid set_commits configuration",
        "Set `auto = true` or provide both `repo` and `commit` under [release.set_commits]",
      ));
    }

    if let Some(deploy) = &self.deploy {
      if deploy.env.trim().is_empty() {
        return Err(BundleError::Config(ConfigError::MissingField {
          field: "release.deploy.env".to_string(),
        }));
      }
      if let (Some(started), Some(finished)) = (deploy.started, deploy.finished)
        && finished < started
      {
        return Err(invalid("release.deploy.finished", "must not be earlier than `started`"));
      }
      if let Some(time) = deploy.time
        && time < 0
      {
        return Err(invalid("release.deploy.time", "must not be negative"));
      }
    }

    Ok(())
  }
}

fn invalid(field: &str, reason: &str) -> BundleError {
  BundleError::Config(ConfigError::Invalid {
    field: field.to_string(),
    reason: reason.to_string(),
  })
}

fn check_glob(field: &str, pattern: &str) -> BundleResult<()> {
  glob::Pattern::new(pattern)
    .map(|_| ())
    .map_err(|e| invalid(field, &format!("'{}' is not a valid glob: {}", pattern, e.msg)))
}
