//! Integration tests for `bundle-rail prepare`

use crate::helpers::{TestProject, run_bundle_rail, run_bundle_rail_raw, stdout_json};
use anyhow::Result;
use bundle_rail::instrument::sourcemap::SourceMap;
use std::path::PathBuf;

#[test]
fn test_prepare_after_inject() -> Result<()> {
  let project = TestProject::new()?;
  project.write("dist/main.js", "main();\n//# sourceMappingURL=main.js.map\n")?;
  project.write(
    "dist/main.js.map",
    r#"{"version":3,"sources":["main.ts"],"names":[],"mappings":"AAAA"}"#,
  )?;
  project.write("dist/plain.js", "plain();")?;

  run_bundle_rail(&project.path, &["inject", "dist/main.js"])?;
  let output = run_bundle_rail(
    &project.path,
    &["prepare", "--assets", "dist/*.js", "--out", "upload", "--json"],
  )?;

  let json = stdout_json(&output)?;
  let prepared = json.as_array().expect("array output");
  assert_eq!(prepared.len(), 1);

  let debug_id = prepared[0]["debug_id"].as_str().unwrap_or_default().to_string();
  let bundle = PathBuf::from(prepared[0]["bundle"].as_str().unwrap_or_default());
  assert!(bundle.ends_with(format!("{}-0.js", debug_id)));

  let code = std::fs::read_to_string(&bundle)?;
  assert!(code.ends_with(&format!("//# debugId={}", debug_id)));

  let map = SourceMap::from_json(&std::fs::read_to_string(format!("{}.map", bundle.display()))?)?;
  assert_eq!(map.debug_id.as_deref(), Some(debug_id.as_str()));
  Ok(())
}

#[test]
fn test_prepare_uses_configured_assets() -> Result<()> {
  let project = TestProject::new()?;
  project.write("bundle-rail.toml", "[sourcemaps]\nassets = [\"build/**/*.js\"]\n")?;
  project.write("build/a.js", "a();")?;

  run_bundle_rail(&project.path, &["inject", "build"])?;
  let output = run_bundle_rail(&project.path, &["prepare", "--out", "out"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Prepared 1 of 1"), "{}", stdout);
  Ok(())
}

#[test]
fn test_prepare_without_assets_is_user_error() -> Result<()> {
  let project = TestProject::new()?;
  let output = run_bundle_rail_raw(&project.path, &["prepare", "--out", "out"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("--assets"));
  Ok(())
}
