//! Integration tests for `bundle-rail id` and `bundle-rail inject`

use crate::helpers::{TestProject, run_bundle_rail, stdout_json};
use anyhow::Result;
use bundle_rail::instrument::DebugId;
use bundle_rail::instrument::snippet::extract_debug_id;
use bundle_rail::instrument::sourcemap::SourceMap;

const BUNDLE: &str = "\"use strict\";\nconsole.log(1);\n//# sourceMappingURL=main.js.map\n";
const MAP: &str = r#"{"version":3,"file":"main.js","sources":["src/main.ts"],"names":[],"mappings":"AAAA;AACA"}"#;

#[test]
fn test_id_matches_content_hash() -> Result<()> {
  let project = TestProject::new()?;
  project.write("a.js", "foo();")?;

  let output = run_bundle_rail(&project.path, &["id", "a.js"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  let expected = DebugId::from_content(b"foo();").to_string();
  assert!(stdout.starts_with(&expected), "unexpected output: {}", stdout);

  let json = stdout_json(&run_bundle_rail(&project.path, &["id", "a.js", "--json"])?)?;
  assert_eq!(json[0]["debug_id"], expected);
  Ok(())
}

#[test]
fn test_inject_places_snippet_after_directive() -> Result<()> {
  let project = TestProject::new()?;
  project.write("dist/main.js", BUNDLE)?;
  project.write("dist/main.js.map", MAP)?;

  run_bundle_rail(&project.path, &["inject", "dist"])?;

  let code = project.read("dist/main.js")?;
  let id = DebugId::from_content(BUNDLE.as_bytes());
  assert!(code.starts_with("\"use strict\";;!function(){"), "{}", code);
  assert!(code.ends_with("console.log(1);\n//# sourceMappingURL=main.js.map\n"));
  assert_eq!(extract_debug_id(&code), Some(id));

  let map = SourceMap::from_json(&project.read("dist/main.js.map")?)?;
  assert_eq!(map.debug_id.as_deref(), Some(id.to_string().as_str()));
  assert_eq!(map.sources, vec!["src/main.ts".to_string()]);
  let first_line = &map.decoded()?[0];
  assert_eq!(first_line[0].generated_column, 0);
  assert_eq!(first_line[0].original.map(|o| o.line), Some(0));
  Ok(())
}

#[test]
fn test_inject_is_idempotent() -> Result<()> {
  let project = TestProject::new()?;
  project.write("dist/main.js", "foo();")?;

  run_bundle_rail(&project.path, &["inject", "dist"])?;
  let first = project.read("dist/main.js")?;

  let output = run_bundle_rail(&project.path, &["inject", "dist", "--json"])?;
  let json = stdout_json(&output)?;
  assert_eq!(json[0]["status"], "already_injected");
  assert_eq!(project.read("dist/main.js")?, first);
  Ok(())
}

#[test]
fn test_inject_dry_run_leaves_files() -> Result<()> {
  let project = TestProject::new()?;
  project.write("dist/main.js", "foo();")?;

  let output = run_bundle_rail(&project.path, &["inject", "dist", "--dry-run", "--json"])?;
  let json = stdout_json(&output)?;
  assert_eq!(json[0]["status"], "injected");
  assert_eq!(json[0]["debug_id"], DebugId::from_content(b"foo();").to_string());
  assert_eq!(project.read("dist/main.js")?, "foo();");
  Ok(())
}

#[test]
fn test_inject_respects_ignore_and_extensions() -> Result<()> {
  let project = TestProject::new()?;
  project.write("dist/app.js", "app();")?;
  project.write("dist/vendor/lib.js", "lib();")?;
  project.write("dist/style.css", "body{}")?;

  run_bundle_rail(&project.path, &["inject", "dist", "--ignore", "vendor/**"])?;

  assert!(extract_debug_id(&project.read("dist/app.js")?).is_some());
  assert_eq!(project.read("dist/vendor/lib.js")?, "lib();");
  assert_eq!(project.read("dist/style.css")?, "body{}");
  Ok(())
}

#[test]
fn test_inject_adds_configured_module_metadata() -> Result<()> {
  let project = TestProject::new()?;
  project.write("bundle-rail.toml", "[injection.module_metadata]\nteam = \"checkout\"\n")?;
  project.write("dist/app.js", "app();")?;

  run_bundle_rail(&project.path, &["inject", "dist"])?;

  let code = project.read("dist/app.js")?;
  assert!(code.contains("_sentryModuleMetadata"));
  assert!(code.contains(r#"{"team":"checkout"}"#));
  assert!(code.ends_with("app();"));

  // the ID covers the metadata snippet, not the bare chunk
  let id = extract_debug_id(&code).expect("debug id present");
  assert_ne!(id, DebugId::from_content(b"app();"));
  let without_id = code.replacen(&bundle_rail::instrument::snippet::debug_id_snippet(id), "", 1);
  assert_eq!(id, DebugId::from_content(without_id.as_bytes()));
  Ok(())
}
