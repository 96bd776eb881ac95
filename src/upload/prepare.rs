//! Debug ID upload preparation
//!
//! Instrumented bundles are copied into an upload folder under names derived from their
//! debug ID, each followed by its source map stamped with the same ID. The release
//! service can then match stack frames to maps by ID alone.

use crate::core::error::{BundleResult, ResultExt};
use crate::instrument::debug_id::DebugId;
use crate::instrument::hooks::strip_query_and_hash;
use crate::instrument::snippet::extract_debug_id;
use crate::instrument::sourcemap::SourceMap;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SOURCE_MAPPING_URL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?m)^[ \t]*//[#@][ \t]*sourceMappingURL=(\S+)[ \t]*$").expect("sourceMappingURL pattern is valid")
});

/// One bundle written to the upload folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedArtifact {
  pub source: PathBuf,
  pub debug_id: DebugId,
  pub bundle: PathBuf,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_map: Option<PathBuf>,
}

/// Where the source map of `bundle` lives, if anywhere
///
/// The last `sourceMappingURL` comment wins. Inline `data:` maps and remote URLs are not
/// files, so those bundles fall back to a `<bundle>.map` sibling.
pub fn locate_source_map(bundle: &Path, code: &str) -> Option<PathBuf> {
  let from_comment = SOURCE_MAPPING_URL
    .captures_iter(code)
    .last()
    .and_then(|caps| caps.get(1))
    .map(|m| strip_query_and_hash(m.as_str()))
    .filter(|url| !url.starts_with("data:") && !url.contains("://"))
    .map(|url| bundle.parent().unwrap_or(Path::new("")).join(url));

  if let Some(path) = from_comment
    && path.is_file()
  {
    return Some(path);
  }

  let mut sibling = bundle.as_os_str().to_owned();
  sibling.push(".map");
  let sibling = PathBuf::from(sibling);
  sibling.is_file().then_some(sibling)
}

/// Copy one instrumented bundle (and its map) into `out_dir`
///
/// Returns `None` for bundles that carry no debug ID.
pub fn prepare_bundle(bundle: &Path, index: usize, out_dir: &Path) -> BundleResult<Option<PreparedArtifact>> {
  let code = fs::read_to_string(bundle).with_context(|| format!("Failed to read {}", bundle.display()))?;
  let Some(debug_id) = extract_debug_id(&code) else {
    tracing::debug!(bundle = %bundle.display(), "no debug id found, skipping");
    return Ok(None);
  };

  let ext = bundle.extension().and_then(|e| e.to_str()).unwrap_or("js");
  let upload_name = format!("{}-{}.{}", debug_id, index, ext);
  let bundle_out = out_dir.join(&upload_name);

  let marker = format!("//# debugId={}", debug_id);
  let content = if code.contains(&marker) {
    code.clone()
  } else {
    format!("{}\n{}", code, marker)
  };
  fs::write(&bundle_out, content).with_context(|| format!("Failed to write {}", bundle_out.display()))?;

  let source_map = match locate_source_map(bundle, &code) {
    Some(map_path) => {
      let json = fs::read_to_string(&map_path).with_context(|| format!("Failed to read {}", map_path.display()))?;
      let mut map =
        SourceMap::from_json(&json).with_context(|| format!("Failed to parse source map {}", map_path.display()))?;
      map.set_debug_id(debug_id);
      let map_out = out_dir.join(format!("{}.map", upload_name));
      fs::write(&map_out, map.to_json()?).with_context(|| format!("Failed to write {}", map_out.display()))?;
      Some(map_out)
    }
    None => {
      tracing::warn!(bundle = %bundle.display(), "no source map found for bundle");
      None
    }
  };

  Ok(Some(PreparedArtifact {
    source: bundle.to_path_buf(),
    debug_id,
    bundle: bundle_out,
    source_map,
  }))
}

/// Prepare every bundle in parallel; indices keep identical bundles apart
pub fn prepare_bundles(bundles: &[PathBuf], out_dir: &Path) -> BundleResult<Vec<PreparedArtifact>> {
  fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

  let prepared = bundles
    .par_iter()
    .enumerate()
    .map(|(index, bundle)| prepare_bundle(bundle, index, out_dir))
    .collect::<BundleResult<Vec<_>>>()?;

  Ok(prepared.into_iter().flatten().collect())
}
