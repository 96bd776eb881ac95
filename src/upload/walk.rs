//! Artifact discovery for uploads and upload preparation

use crate::core::error::{BundleError, BundleResult};
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: false,
  require_literal_leading_dot: false,
};

/// Compiled ignore patterns
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
  patterns: Vec<Pattern>,
}

impl IgnoreSet {
  pub fn new(patterns: &[String]) -> BundleResult<Self> {
    let patterns = patterns
      .iter()
      .map(|p| Pattern::new(p))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { patterns })
  }

  /// Whether `relative` (or its file name) matches any pattern
  pub fn is_ignored(&self, relative: &Path) -> bool {
    let file_name = relative.file_name().map(Path::new);
    self.patterns.iter().any(|p| {
      p.matches_path_with(relative, MATCH_OPTIONS) || file_name.is_some_and(|name| p.matches_path_with(name, MATCH_OPTIONS))
    })
  }
}

/// Collect files below `paths` (relative to `base`), filtered by ignore globs and extensions
///
/// Ignore patterns match against the path relative to its include entry. An empty
/// `extensions` list accepts every file. Missing include paths contribute nothing.
pub fn collect_files(base: &Path, paths: &[PathBuf], ignore: &[String], extensions: &[String]) -> BundleResult<Vec<PathBuf>> {
  let ignore = IgnoreSet::new(ignore)?;
  let mut found = BTreeSet::new();

  for include in paths {
    let root = base.join(include);
    if root.is_file() {
      if has_extension(&root, extensions) && !ignore.is_ignored(Path::new(root.file_name().unwrap_or_default())) {
        found.insert(root);
      }
      continue;
    }
    if !root.is_dir() {
      tracing::debug!(path = %root.display(), "upload path does not exist");
      continue;
    }

    let pattern = format!("{}/**/*", Pattern::escape(&root.to_string_lossy()));
    for entry in glob::glob(&pattern)? {
      let path = entry.map_err(|e| BundleError::message(format!("Failed to read {}: {}", e.path().display(), e.error())))?;
      if !path.is_file() || !has_extension(&path, extensions) {
        continue;
      }
      let relative = path.strip_prefix(&root)?;
      if ignore.is_ignored(relative) {
        continue;
      }
      found.insert(path);
    }
  }

  Ok(found.into_iter().collect())
}

/// Expand asset globs relative to `base`, dropping ignored and non-file matches
pub fn collect_assets(base: &Path, assets: &[String], ignore: &[String]) -> BundleResult<Vec<PathBuf>> {
  let ignore = IgnoreSet::new(ignore)?;
  let mut found = BTreeSet::new();

  for asset in assets {
    let pattern = if Path::new(asset).is_absolute() {
      asset.clone()
    } else {
      format!("{}/{}", Pattern::escape(&base.to_string_lossy()), asset)
    };
    for entry in glob::glob(&pattern)? {
      let path = entry.map_err(|e| BundleError::message(format!("Failed to read {}: {}", e.path().display(), e.error())))?;
      if !path.is_file() {
        continue;
      }
      let relative = path.strip_prefix(base).unwrap_or(&path);
      if !ignore.is_ignored(relative) {
        found.insert(path);
      }
    }
  }

  Ok(found.into_iter().collect())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
  extensions.is_empty()
    || path
      .extension()
      .and_then(|e| e.to_str())
      .is_some_and(|ext| extensions.iter().any(|want| want.trim_start_matches('.') == ext))
}
