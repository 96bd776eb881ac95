//! Position-preserving text editor
//!
//! The original buffer is never mutated. Edits are recorded as a list anchored at
//! original byte offsets; rendering and map generation are two independent passes over
//! that list, so every generated position can be traced back to exactly one original
//! position (or to none, for injected text).
//!
//! Patterns are always matched against the original text, not against earlier edits.

use crate::core::error::{BundleResult, EditError};
use crate::instrument::sourcemap::{Mappings, Segment, SourceMap, SourcePosition};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::ops::Range;

/// How densely unchanged text is mapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapResolution {
  /// A segment at every line start, after every edit and at every word boundary
  #[default]
  Boundary,
  /// A segment for every character
  Characters,
}

/// Options for [`TextEditor::generate_map`]
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
  /// Value of the map's `file` key
  pub file: Option<String>,
  /// Name recorded in `sources`
  pub source: String,
  /// Embed the original text as `sourcesContent`
  pub include_content: bool,
  pub resolution: MapResolution,
}

#[derive(Debug, Clone)]
struct Replacement {
  range: Range<usize>,
  text: String,
}

/// One rendered piece of the edited buffer
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'a> {
  Original(Range<usize>),
  Inserted(&'a str),
  Replaced { start: usize, text: &'a str },
}

/// Edit list over an immutable original buffer
#[derive(Debug, Clone)]
pub struct TextEditor {
  original: String,
  inserts: BTreeMap<usize, VecDeque<String>>,
  replacements: Vec<Replacement>,
}

impl TextEditor {
  pub fn new(original: impl Into<String>) -> Self {
    Self {
      original: original.into(),
      inserts: BTreeMap::new(),
      replacements: Vec::new(),
    }
  }

  pub fn original(&self) -> &str {
    &self.original
  }

  /// Whether any edit has been recorded
  pub fn has_changes(&self) -> bool {
    !self.inserts.is_empty() || !self.replacements.is_empty()
  }

  /// Insert text before everything, including earlier prepends
  pub fn prepend(&mut self, text: impl Into<String>) {
    self.inserts.entry(0).or_default().push_front(text.into());
  }

  /// Insert text after everything, including earlier appends
  pub fn append(&mut self, text: impl Into<String>) {
    let end = self.original.len();
    self.inserts.entry(end).or_default().push_back(text.into());
  }

  /// Insert text at an original offset, after earlier inserts at the same offset
  pub fn insert(&mut self, at: usize, text: impl Into<String>) -> BundleResult<()> {
    self.check_offset(at)?;
    if self.replacements.iter().any(|r| r.range.start < at && at < r.range.end) {
      return Err(EditError::Overlap { start: at, end: at }.into());
    }
    self.inserts.entry(at).or_default().push_back(text.into());
    Ok(())
  }

  /// Replace the first match of `pattern` in the original text
  ///
  /// Returns `Ok(false)` without touching the buffer when nothing matches. An empty match
  /// is rejected: callers wanting to insert at a zero-width position must prepend or
  /// insert instead.
  pub fn replace_match<F>(&mut self, pattern: &Regex, replacer: F) -> BundleResult<bool>
  where
    F: FnOnce(&str) -> String,
  {
    let Some(found) = pattern.find(&self.original) else {
      return Ok(false);
    };
    if found.is_empty() {
      return Err(
        EditError::EmptyMatch {
          pattern: pattern.as_str().to_string(),
        }
        .into(),
      );
    }

    let range = found.range();
    let replacement = replacer(found.as_str());
    self.replace_range(range, replacement)?;
    Ok(true)
  }

  /// Replace an original byte range
  ///
  /// When the replacement begins with the text it replaces, that text stays mapped
  /// verbatim and only the remainder is recorded as an insertion.
  pub fn replace_range(&mut self, range: Range<usize>, text: impl Into<String>) -> BundleResult<()> {
    let text = text.into();
    self.check_offset(range.start)?;
    self.check_offset(range.end)?;
    if range.is_empty() {
      return Err(
        EditError::EmptyMatch {
          pattern: format!("{}..{}", range.start, range.end),
        }
        .into(),
      );
    }

    let current = &self.original[range.clone()];
    if let Some(suffix) = text.strip_prefix(current) {
      if suffix.is_empty() {
        return Ok(());
      }
      let suffix = suffix.to_string();
      return self.insert(range.end, suffix);
    }

    let collides = self
      .replacements
      .iter()
      .any(|r| range.start < r.range.end && r.range.start < range.end)
      || self.inserts.keys().any(|&at| range.start < at && at < range.end);
    if collides {
      return Err(
        EditError::Overlap {
          start: range.start,
          end: range.end,
        }
        .into(),
      );
    }

    let idx = self.replacements.partition_point(|r| r.range.start < range.start);
    self.replacements.insert(idx, Replacement { range, text });
    Ok(())
  }

  fn check_offset(&self, offset: usize) -> BundleResult<()> {
    if offset > self.original.len() || !self.original.is_char_boundary(offset) {
      return Err(
        EditError::OutOfBounds {
          offset,
          len: self.original.len(),
        }
        .into(),
      );
    }
    Ok(())
  }

  fn pieces(&self) -> Vec<Piece<'_>> {
    let mut boundaries: BTreeSet<usize> = self.inserts.keys().copied().collect();
    boundaries.extend(self.replacements.iter().map(|r| r.range.start));
    boundaries.insert(self.original.len());

    let mut pieces = Vec::new();
    let mut pos = 0;
    for boundary in boundaries {
      if boundary < pos {
        continue;
      }
      if boundary > pos {
        pieces.push(Piece::Original(pos..boundary));
        pos = boundary;
      }
      if let Some(texts) = self.inserts.get(&boundary) {
        pieces.extend(texts.iter().map(|t| Piece::Inserted(t.as_str())));
      }
      if let Some(r) = self.replacements.iter().find(|r| r.range.start == boundary) {
        pieces.push(Piece::Replaced {
          start: r.range.start,
          text: &r.text,
        });
        pos = r.range.end;
      }
    }
    pieces
  }

  /// Map an original byte offset to its offset in the edited buffer
  ///
  /// Text inserted at an offset lands before the original character there. Offsets
  /// inside a replaced range collapse onto the start of the replacement.
  pub fn translate_offset(&self, offset: usize) -> usize {
    let mut shift: isize = 0;
    for (_, texts) in self.inserts.range(..=offset) {
      shift += texts.iter().map(|t| t.len() as isize).sum::<isize>();
    }
    for r in &self.replacements {
      if r.range.end <= offset {
        shift += r.text.len() as isize - r.range.len() as isize;
      } else if r.range.start <= offset {
        return (r.range.start as isize + shift) as usize;
      } else {
        break;
      }
    }
    (offset as isize + shift) as usize
  }

  /// Build a map from the edited buffer back to the original
  pub fn generate_map(&self, options: &MapOptions) -> SourceMap {
    let mut lines: Mappings = vec![Vec::new()];
    let mut generated = Utf16Cursor::new("");
    let mut original = Utf16Cursor::new(&self.original);

    for piece in self.pieces() {
      match piece {
        Piece::Original(range) => {
          let (mut line, mut column) = original.position_of(range.start);
          let mut at_piece_start = true;
          let mut prev_word: Option<bool> = None;

          for ch in self.original[range].chars() {
            if ch == '\n' {
              lines.push(Vec::new());
              generated.newline();
              line += 1;
              column = 0;
              at_piece_start = true;
              prev_word = None;
              continue;
            }

            let is_word = ch.is_alphanumeric() || ch == '_' || ch == '$';
            let emit = at_piece_start
              || match options.resolution {
                MapResolution::Characters => true,
                MapResolution::Boundary => prev_word != Some(is_word),
              };
            if emit {
              push_segment(&mut lines, generated.column, line, column);
            }

            at_piece_start = false;
            prev_word = Some(is_word);
            generated.column += ch.len_utf16() as u32;
            column += ch.len_utf16() as u32;
          }
        }
        Piece::Inserted(text) => {
          for ch in text.chars() {
            if ch == '\n' {
              lines.push(Vec::new());
              generated.newline();
            } else {
              generated.column += ch.len_utf16() as u32;
            }
          }
        }
        Piece::Replaced { start, text } => {
          let (line, column) = original.position_of(start);
          if !text.is_empty() {
            push_segment(&mut lines, generated.column, line, column);
          }
          for ch in text.chars() {
            if ch == '\n' {
              lines.push(Vec::new());
              generated.newline();
            } else {
              generated.column += ch.len_utf16() as u32;
            }
          }
        }
      }
    }

    let content = options.include_content.then(|| self.original.clone());
    SourceMap::new(options.file.clone(), options.source.clone(), content, &lines)
  }

  /// Move a map that describes the original buffer onto the edited buffer
  ///
  /// `upstream`'s generated positions refer to the original text; the result keeps its
  /// sources and names and points the same original locations at their new positions.
  pub fn rebase_map(&self, upstream: &SourceMap) -> BundleResult<SourceMap> {
    let edited = self.to_string();
    let decoded = upstream.decoded()?;

    let mut source_cursor = Utf16Cursor::new(&self.original);
    let mut edited_cursor = Utf16Cursor::new(&edited);
    let mut lines: Mappings = vec![Vec::new(); edited.matches('\n').count() + 1];

    for (line_no, line) in decoded.iter().enumerate() {
      for segment in line {
        let Some(offset) = source_cursor.offset_of(line_no as u32, segment.generated_column) else {
          continue;
        };
        let (new_line, new_column) = edited_cursor.position_of(self.translate_offset(offset));
        lines[new_line as usize].push(Segment {
          generated_column: new_column,
          original: segment.original,
        });
      }
    }

    let mut rebased = upstream.clone();
    rebased.mappings = crate::instrument::sourcemap::encode_mappings(&lines);
    Ok(rebased)
  }
}

impl fmt::Display for TextEditor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for piece in self.pieces() {
      match piece {
        Piece::Original(range) => f.write_str(&self.original[range])?,
        Piece::Inserted(text) | Piece::Replaced { text, .. } => f.write_str(text)?,
      }
    }
    Ok(())
  }
}

fn push_segment(lines: &mut Mappings, generated_column: u32, line: u32, column: u32) {
  if let Some(current) = lines.last_mut() {
    current.push(Segment {
      generated_column,
      original: Some(SourcePosition {
        source: 0,
        line,
        column,
        name: None,
      }),
    });
  }
}

/// Forward-moving cursor converting between byte offsets and (line, UTF-16 column)
///
/// Lookups are expected in ascending order; a lookup behind the cursor rescans from the
/// start.
struct Utf16Cursor<'a> {
  text: &'a str,
  offset: usize,
  line: u32,
  column: u32,
}

impl<'a> Utf16Cursor<'a> {
  fn new(text: &'a str) -> Self {
    Self {
      text,
      offset: 0,
      line: 0,
      column: 0,
    }
  }

  fn newline(&mut self) {
    self.line += 1;
    self.column = 0;
  }

  fn step(&mut self) -> Option<char> {
    let ch = self.text[self.offset..].chars().next()?;
    self.offset += ch.len_utf8();
    if ch == '\n' {
      self.newline();
    } else {
      self.column += ch.len_utf16() as u32;
    }
    Some(ch)
  }

  fn position_of(&mut self, target: usize) -> (u32, u32) {
    if target < self.offset {
      *self = Self::new(self.text);
    }
    while self.offset < target {
      if self.step().is_none() {
        break;
      }
    }
    (self.line, self.column)
  }

  fn offset_of(&mut self, line: u32, column: u32) -> Option<usize> {
    if (line, column) < (self.line, self.column) {
      *self = Self::new(self.text);
    }
    while (self.line, self.column) < (line, column) {
      let next = self.text[self.offset..].chars().next()?;
      if next == '\n' && self.line == line {
        // column past the end of this line
        return None;
      }
      self.step();
    }
    Some(self.offset)
  }
}
