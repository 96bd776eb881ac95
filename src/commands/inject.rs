use crate::commands::load_config_or_default;
use crate::ui::progress::FileProgress;
use bundle_rail::core::config::BundleConfig;
use bundle_rail::core::error::{BundleResult, ResultExt};
use bundle_rail::instrument::DebugId;
use bundle_rail::instrument::prologue::insert_after_prologue;
use bundle_rail::instrument::snippet::{debug_id_snippet, extract_debug_id, module_metadata_snippet};
use bundle_rail::instrument::sourcemap::SourceMap;
use bundle_rail::upload::prepare::locate_source_map;
use bundle_rail::upload::walk::collect_files;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum InjectStatus {
  Injected,
  AlreadyInjected,
}

#[derive(Debug, Serialize)]
struct InjectOutcome {
  path: PathBuf,
  debug_id: DebugId,
  status: InjectStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  source_map: Option<PathBuf>,
}

/// Run the inject command
pub fn run_inject(
  current_dir: &Path,
  config_path: Option<&Path>,
  paths: &[PathBuf],
  ignore: &[String],
  ext: &[String],
  dry_run: bool,
  json: bool,
) -> BundleResult<()> {
  let config = load_config_or_default(current_dir, config_path)?;
  let files = collect_files(current_dir, paths, ignore, ext)?;

  if files.is_empty() {
    if json {
      println!("[]");
    } else {
      println!("⚠️  No matching files found");
    }
    return Ok(());
  }

  if !json {
    println!("💉 Injecting debug IDs into {} file(s)...", files.len());
  }
  let progress = if json || files.len() < 2 {
    FileProgress::hidden()
  } else {
    FileProgress::new(files.len(), "Injecting")
  };

  let outcomes = files
    .par_iter()
    .map(|file| {
      let outcome = inject_file(file, &config, dry_run);
      progress.inc();
      outcome
    })
    .collect::<BundleResult<Vec<_>>>()?;

  if json {
    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    return Ok(());
  }

  if dry_run {
    println!("\n🔍 DRY-RUN MODE - No files were written");
  }
  for outcome in &outcomes {
    match outcome.status {
      InjectStatus::Injected => {
        let map_note = outcome
          .source_map
          .as_ref()
          .map(|m| format!(" (map: {})", m.display()))
          .unwrap_or_default();
        println!("   ✅ {} {}{}", outcome.debug_id, outcome.path.display(), map_note);
      }
      InjectStatus::AlreadyInjected => {
        println!("   ⏭️  {} {} (already injected)", outcome.debug_id, outcome.path.display());
      }
    }
  }

  let injected = outcomes.iter().filter(|o| o.status == InjectStatus::Injected).count();
  println!("\n🎉 Injected {} of {} file(s)", injected, outcomes.len());
  Ok(())
}

/// Rendered output for one file, held in memory until every piece is ready
#[derive(Debug)]
struct InjectPlan {
  bundle: PathBuf,
  code: String,
  debug_id: DebugId,
  map: Option<(PathBuf, String)>,
}

impl InjectPlan {
  /// Write the bundle, then its map
  ///
  /// A map is never left describing code that did not reach the disk.
  fn apply(&self) -> BundleResult<()> {
    fs::write(&self.bundle, &self.code).with_context(|| format!("Failed to write {}", self.bundle.display()))?;
    if let Some((map_path, json)) = &self.map {
      fs::write(map_path, json).with_context(|| format!("Failed to write {}", map_path.display()))?;
    }
    Ok(())
  }
}

/// Instrument one file on disk, rebasing the map it already ships
fn inject_file(path: &Path, config: &BundleConfig, dry_run: bool) -> BundleResult<InjectOutcome> {
  let code = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

  if let Some(existing) = extract_debug_id(&code) {
    return Ok(InjectOutcome {
      path: path.to_path_buf(),
      debug_id: existing,
      status: InjectStatus::AlreadyInjected,
      source_map: None,
    });
  }

  let plan = plan_injection(path, &code, config)?;
  if !dry_run {
    plan.apply()?;
  }
  tracing::debug!(file = %path.display(), debug_id = %plan.debug_id, dry_run, "injected file");

  Ok(InjectOutcome {
    path: plan.bundle,
    debug_id: plan.debug_id,
    status: InjectStatus::Injected,
    source_map: plan.map.map(|(map_path, _)| map_path),
  })
}

/// Render the instrumented bundle and its rebased map without touching the disk
///
/// The debug ID hashes the code after module metadata is in place, the same content the
/// bundler hook chain hashes, so both paths stamp identical IDs.
fn plan_injection(path: &Path, code: &str, config: &BundleConfig) -> BundleResult<InjectPlan> {
  let metadata = config
    .injection
    .module_metadata
    .as_ref()
    .map(module_metadata_snippet)
    .unwrap_or_default();

  let hashed = if metadata.is_empty() {
    code.to_string()
  } else {
    insert_after_prologue(code, &metadata)?.to_string()
  };
  let debug_id = DebugId::from_content(hashed.as_bytes());

  let snippet = format!("{}{}", debug_id_snippet(debug_id), metadata);
  let editor = insert_after_prologue(code, &snippet)?;

  let map = match locate_source_map(path, code) {
    Some(map_path) => {
      let json = fs::read_to_string(&map_path).with_context(|| format!("Failed to read {}", map_path.display()))?;
      let upstream =
        SourceMap::from_json(&json).with_context(|| format!("Failed to parse source map {}", map_path.display()))?;
      let mut rebased = editor.rebase_map(&upstream)?;
      rebased.set_debug_id(debug_id);
      Some((map_path, rebased.to_json()?))
    }
    None => None,
  };

  Ok(InjectPlan {
    bundle: path.to_path_buf(),
    code: editor.to_string(),
    debug_id,
    map,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use bundle_rail::BundlePlugin;
  use bundle_rail::release::ErrorSink;
  use tempfile::TempDir;

  const MAP: &str = r#"{"version":3,"sources":["src/app.ts"],"names":[],"mappings":"AAAA"}"#;

  fn metadata_config() -> BundleConfig {
    let mut config = BundleConfig::default();
    config.release.inject = false;
    config.injection.module_metadata = Some(serde_json::json!({ "team": "checkout" }));
    config
  }

  #[test]
  fn test_inject_matches_plugin_output_with_metadata() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.js");
    let code = "'use strict';app();";
    fs::write(&file, code).unwrap();

    let config = metadata_config();
    let outcome = inject_file(&file, &config, false).unwrap();

    let plugin = BundlePlugin::with_release(config, None, dir.path(), ErrorSink::default()).unwrap();
    let rendered = plugin.render_chunk(code, "app.js").unwrap().unwrap();

    assert_eq!(fs::read_to_string(&file).unwrap(), rendered.code);
    assert_eq!(extract_debug_id(&rendered.code), Some(outcome.debug_id));
  }

  #[test]
  fn test_plan_leaves_disk_untouched() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.js");
    fs::write(&file, "app();\n//# sourceMappingURL=app.js.map").unwrap();
    fs::write(dir.path().join("app.js.map"), MAP).unwrap();

    let plan = plan_injection(&file, &fs::read_to_string(&file).unwrap(), &BundleConfig::default()).unwrap();
    assert!(plan.map.is_some());
    assert_eq!(fs::read_to_string(dir.path().join("app.js.map")).unwrap(), MAP);
    assert!(extract_debug_id(&fs::read_to_string(&file).unwrap()).is_none());
  }

  #[test]
  fn test_failed_bundle_write_keeps_map() {
    let dir = TempDir::new().unwrap();
    let map_path = dir.path().join("app.js.map");
    fs::write(&map_path, MAP).unwrap();

    // a directory cannot be overwritten as a file
    let bundle = dir.path().join("app.js");
    fs::create_dir(&bundle).unwrap();

    let plan = InjectPlan {
      bundle,
      code: "app();".to_string(),
      debug_id: DebugId::from_content(b"app();"),
      map: Some((map_path.clone(), "{}".to_string())),
    };
    assert!(plan.apply().is_err());
    assert_eq!(fs::read_to_string(&map_path).unwrap(), MAP);
  }
}
