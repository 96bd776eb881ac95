//! Module metadata injection into rendered chunks
//!
//! Lets a runtime SDK look up arbitrary build-time metadata (team, bundle kind) for the
//! module a stack frame belongs to. Placement follows the same prologue rules as debug
//! IDs.

use crate::core::error::BundleResult;
use crate::instrument::debug_id_injector::is_script_chunk;
use crate::instrument::editor::{MapOptions, MapResolution};
use crate::instrument::hooks::{BuildHooks, TransformOutput};
use crate::instrument::prologue::insert_after_prologue;
use crate::instrument::snippet::module_metadata_snippet;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ModuleMetadataInjector {
  snippet: String,
  resolution: MapResolution,
}

impl ModuleMetadataInjector {
  pub fn new(metadata: &Value, resolution: MapResolution) -> Self {
    Self {
      snippet: module_metadata_snippet(metadata),
      resolution,
    }
  }

  pub fn on_chunk_rendered(&self, code: &str, file_name: &str) -> BundleResult<Option<TransformOutput>> {
    if !is_script_chunk(file_name) {
      return Ok(None);
    }

    let editor = insert_after_prologue(code, &self.snippet)?;
    Ok(Some(TransformOutput {
      code: editor.to_string(),
      map: editor.generate_map(&MapOptions {
        file: Some(file_name.to_string()),
        source: file_name.to_string(),
        include_content: false,
        resolution: self.resolution,
      }),
    }))
  }
}

impl BuildHooks for ModuleMetadataInjector {
  fn name(&self) -> &str {
    "module-metadata-injection"
  }

  fn render_chunk(&self, code: &str, file_name: &str) -> BundleResult<Option<TransformOutput>> {
    self.on_chunk_rendered(code, file_name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_metadata_after_directive() {
    let inj = ModuleMetadataInjector::new(&serde_json::json!({ "team": "web" }), MapResolution::Boundary);
    let out = inj.on_chunk_rendered("'use strict';go();", "app.cjs").unwrap().unwrap();
    assert!(out.code.starts_with("'use strict';;!function(){"));
    assert!(out.code.ends_with("go();"));
    assert!(out.code.contains(r#"{"team":"web"}"#));
  }

  #[test]
  fn test_metadata_skips_non_scripts() {
    let inj = ModuleMetadataInjector::new(&serde_json::json!({}), MapResolution::Boundary);
    assert!(inj.on_chunk_rendered("a{}", "app.css").unwrap().is_none());
  }
}
