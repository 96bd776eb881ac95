//! Debug ID injection into rendered chunks

use crate::core::error::BundleResult;
use crate::instrument::debug_id::DebugId;
use crate::instrument::editor::{MapOptions, MapResolution, TextEditor};
use crate::instrument::hooks::{BuildHooks, TransformOutput, strip_query_and_hash};
use crate::instrument::prologue::insert_after_prologue;
use crate::instrument::snippet::debug_id_snippet;

/// Chunk extensions that are executed as scripts
pub const SCRIPT_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs"];

/// Whether a chunk file name denotes an executable script
pub fn is_script_chunk(file_name: &str) -> bool {
  let path = strip_query_and_hash(file_name);
  SCRIPT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Stamps every script chunk with the debug ID of its rendered content
#[derive(Debug, Clone, Default)]
pub struct DebugIdInjector {
  resolution: MapResolution,
}

impl DebugIdInjector {
  pub fn new(resolution: MapResolution) -> Self {
    Self { resolution }
  }

  /// Derive the debug ID for `code` and place its snippet after the prologue
  ///
  /// Returns `None` for chunks that are not scripts.
  pub fn instrument(&self, code: &str, file_name: &str) -> BundleResult<Option<(DebugId, TextEditor)>> {
    if !is_script_chunk(file_name) {
      return Ok(None);
    }

    let id = DebugId::from_content(code.as_bytes());
    let editor = insert_after_prologue(code, &debug_id_snippet(id))?;
    tracing::debug!(chunk = file_name, debug_id = %id, "injected debug id");
    Ok(Some((id, editor)))
  }

  pub fn on_chunk_rendered(&self, code: &str, file_name: &str) -> BundleResult<Option<TransformOutput>> {
    let Some((_, editor)) = self.instrument(code, file_name)? else {
      return Ok(None);
    };

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

impl BuildHooks for DebugIdInjector {
  fn name(&self) -> &str {
    "debug-id-injection"
  }

  fn render_chunk(&self, code: &str, file_name: &str) -> BundleResult<Option<TransformOutput>> {
    self.on_chunk_rendered(code, file_name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_directive_precedes_snippet() {
    let code = "\"use strict\";\n// comment\nfoo();";
    let out = DebugIdInjector::default().on_chunk_rendered(code, "main.js").unwrap().unwrap();
    let snippet = debug_id_snippet(DebugId::from_content(code.as_bytes()));

    assert!(out.code.starts_with("\"use strict\";"));
    let snippet_at = out.code.find(&snippet).unwrap();
    let foo_at = out.code.find("foo();").unwrap();
    assert_eq!(snippet_at, "\"use strict\";".len());
    assert!(snippet_at < foo_at);
  }

  #[test]
  fn test_plain_code_gets_snippet_prepended() {
    let out = DebugIdInjector::default().on_chunk_rendered("foo();", "main.js").unwrap().unwrap();
    let snippet = debug_id_snippet(DebugId::from_content(b"foo();"));
    assert_eq!(out.code, format!("{}foo();", snippet));
  }

  #[test]
  fn test_non_script_chunks_declined() {
    let inj = DebugIdInjector::default();
    assert!(inj.on_chunk_rendered("<html></html>", "index.html").unwrap().is_none());
    assert!(inj.on_chunk_rendered("{}", "manifest.json").unwrap().is_none());
    assert!(inj.on_chunk_rendered("x", "style.css").unwrap().is_none());
  }

  #[test]
  fn test_query_suffix_still_matches() {
    let inj = DebugIdInjector::default();
    assert!(inj.on_chunk_rendered("x();", "chunk.mjs?v=3").unwrap().is_some());
  }

  #[test]
  fn test_identical_chunks_identical_output() {
    let inj = DebugIdInjector::default();
    let a = inj.on_chunk_rendered("x();", "a.js").unwrap().unwrap();
    let b = inj.on_chunk_rendered("x();", "b.js").unwrap().unwrap();
    assert_eq!(a.code, b.code);
    assert_eq!(a.map.file.as_deref(), Some("a.js"));
    assert_eq!(b.map.file.as_deref(), Some("b.js"));
  }

  #[test]
  fn test_map_points_code_at_original_offsets() {
    let out = DebugIdInjector::default().on_chunk_rendered("foo();", "main.js").unwrap().unwrap();
    let snippet_len = debug_id_snippet(DebugId::from_content(b"foo();")).len() as u32;
    let decoded = out.map.decoded().unwrap();
    let first = decoded[0][0];
    assert_eq!(first.generated_column, snippet_len);
    assert_eq!(first.original.unwrap().column, 0);
  }
}
