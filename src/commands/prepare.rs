use crate::commands::load_config_or_default;
use bundle_rail::core::error::{BundleError, BundleResult};
use bundle_rail::upload::{collect_assets, prepare_bundles};
use std::path::Path;

/// Run the prepare command
pub fn run_prepare(
  current_dir: &Path,
  config_path: Option<&Path>,
  assets: Vec<String>,
  ignore: Vec<String>,
  out: &Path,
  json: bool,
) -> BundleResult<()> {
  let config = load_config_or_default(current_dir, config_path)?;
  let assets = if assets.is_empty() { config.sourcemaps.assets } else { assets };
  let ignore = if ignore.is_empty() { config.sourcemaps.ignore } else { ignore };

  if assets.is_empty() {
    return Err(BundleError::with_help(
      "No assets to prepare",
      "Pass --assets <glob> or set `sourcemaps.assets` in bundle-rail.toml",
    ));
  }

  let bundles = collect_assets(current_dir, &assets, &ignore)?;
  let out_dir = current_dir.join(out);
  let prepared = prepare_bundles(&bundles, &out_dir)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&prepared)?);
    return Ok(());
  }

  println!("📦 Prepared {} of {} bundle(s) in {}", prepared.len(), bundles.len(), out_dir.display());
  for artifact in &prepared {
    let map_note = if artifact.source_map.is_some() { "" } else { " (no source map)" };
    println!("   • {} ← {}{}", artifact.debug_id, artifact.source.display(), map_note);
  }
  let skipped = bundles.len() - prepared.len();
  if skipped > 0 {
    println!("   ⏭️  {} bundle(s) carried no debug ID", skipped);
  }
  Ok(())
}
