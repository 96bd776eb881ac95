//! Release name detection
//!
//! Order: explicit name, then the commit variables CI providers export, then the git
//! HEAD of the project directory.

use crate::core::vcs::SystemGit;
use std::path::Path;

/// Environment variables consulted for a release name, in priority order
pub const RELEASE_ENV_VARS: &[&str] = &[
  "SENTRY_RELEASE",
  "SOURCE_VERSION",
  "HEROKU_BUILD_COMMIT",
  "HEROKU_SLUG_COMMIT",
  "CODEBUILD_RESOLVED_SOURCE_VERSION",
  "CIRCLE_SHA1",
  "CF_PAGES_COMMIT_SHA",
  "VERCEL_GIT_COMMIT_SHA",
  "GITHUB_SHA",
  "CI_COMMIT_SHA",
  "COMMIT_REF",
  "RENDER_GIT_COMMIT",
  "BITBUCKET_COMMIT",
  "TRAVIS_COMMIT",
  "BUILDKITE_COMMIT",
  "DRONE_COMMIT_SHA",
  "GIT_COMMIT",
];

/// Resolve a release name, reading the process environment
pub fn detect_release_name(configured: Option<&str>, project_dir: Option<&Path>) -> Option<String> {
  resolve_release_name(configured, |key| std::env::var(key).ok(), project_dir)
}

/// Resolve a release name with an injectable environment lookup
///
/// Blank values count as unset.
pub fn resolve_release_name<F>(configured: Option<&str>, lookup: F, project_dir: Option<&Path>) -> Option<String>
where
  F: Fn(&str) -> Option<String>,
{
  if let Some(name) = non_blank(configured.map(str::to_string)) {
    return Some(name);
  }

  for key in RELEASE_ENV_VARS {
    if let Some(value) = non_blank(lookup(key)) {
      tracing::debug!(source = key, release = %value, "release name from environment");
      return Some(value);
    }
  }

  let dir = project_dir?;
  match SystemGit::open(dir).and_then(|git| git.head_commit()) {
    Ok(sha) => {
      tracing::debug!(release = %sha, "release name from git HEAD");
      Some(sha)
    }
    Err(e) => {
      tracing::debug!(error = %e, "no release name from git");
      None
    }
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
