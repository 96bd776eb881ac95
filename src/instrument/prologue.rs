//! Placement of chunk-level snippets after the leading prologue
//!
//! A chunk may open with a hashbang, whitespace, comments and one directive such as
//! `"use strict";`. Code placed before a directive silently disables it, so snippets go
//! directly after whatever prologue the chunk has.

use crate::core::error::BundleResult;
use crate::instrument::editor::TextEditor;
use regex::Regex;
use std::sync::LazyLock;

static PROLOGUE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"^(?:#![^\n\r]*[\n\r])?(?:\s+|/\*(?s:.)*?\*/|//[^\n\r]*[\n\r])*(?:"[^"]*";|'[^']*';)?"#)
    .expect("prologue pattern is valid")
});

/// Length in bytes of the leading prologue
pub fn prologue_len(code: &str) -> usize {
  PROLOGUE.find(code).map(|m| m.end()).unwrap_or(0)
}

/// Editor with `snippet` placed after the prologue of `code`
///
/// An empty prologue cannot go through `replace_match`, so that case prepends.
pub fn insert_after_prologue(code: &str, snippet: &str) -> BundleResult<TextEditor> {
  let mut editor = TextEditor::new(code);
  if prologue_len(code) > 0 {
    editor.replace_match(&PROLOGUE, |prologue| format!("{}{}", prologue, snippet))?;
  } else {
    editor.prepend(snippet);
  }
  Ok(editor)
}
