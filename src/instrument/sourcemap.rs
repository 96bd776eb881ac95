//! Source map v3 model, Base64 VLQ codec and map composition

use crate::core::error::{BundleError, BundleResult};
use crate::instrument::debug_id::DebugId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A revision 3 source map
///
/// Keys this model does not know about (`x_google_ignoreList`, vendor extensions) are kept
/// in `extra` so that rewriting a map never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
  pub version: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file: Option<String>,
  #[serde(rename = "sourceRoot", default, skip_serializing_if = "Option::is_none")]
  pub source_root: Option<String>,
  #[serde(default)]
  pub sources: Vec<String>,
  #[serde(rename = "sourcesContent", default, skip_serializing_if = "Option::is_none")]
  pub sources_content: Option<Vec<Option<String>>>,
  #[serde(default)]
  pub names: Vec<String>,
  pub mappings: String,
  #[serde(rename = "debug_id", default, skip_serializing_if = "Option::is_none")]
  pub debug_id: Option<String>,
  #[serde(rename = "debugId", default, skip_serializing_if = "Option::is_none")]
  pub debug_id_camel: Option<String>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Original-side half of a mapping segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
  pub source: u32,
  pub line: u32,
  pub column: u32,
  pub name: Option<u32>,
}

/// One decoded mapping segment; the generated line is its index in the outer vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
  pub generated_column: u32,
  pub original: Option<SourcePosition>,
}

/// Mappings grouped by generated line
pub type Mappings = Vec<Vec<Segment>>;

impl SourceMap {
  /// Build a map for a single source file
  pub fn new(file: Option<String>, source: impl Into<String>, content: Option<String>, mappings: &Mappings) -> Self {
    Self {
      version: 3,
      file,
      source_root: None,
      sources: vec![source.into()],
      sources_content: Some(vec![content]),
      names: Vec::new(),
      mappings: encode_mappings(mappings),
      debug_id: None,
      debug_id_camel: None,
      extra: serde_json::Map::new(),
    }
  }

  /// Parse a map from JSON text
  pub fn from_json(json: &str) -> BundleResult<Self> {
    Ok(serde_json::from_str(json)?)
  }

  /// Serialize to compact JSON
  pub fn to_json(&self) -> BundleResult<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Decode the `mappings` field
  pub fn decoded(&self) -> BundleResult<Mappings> {
    decode_mappings(&self.mappings)
  }

  /// Stamp a debug ID under both spellings consumers look for
  pub fn set_debug_id(&mut self, id: DebugId) {
    self.debug_id = Some(id.to_string());
    self.debug_id_camel = Some(id.to_string());
  }

  /// Trace `self` (generated -> intermediate) through `inner` (intermediate -> original)
  ///
  /// Each segment of `self` is looked up in `inner` at the nearest segment at or before
  /// its intermediate column; segments that land on unmapped code are dropped.
  pub fn compose(&self, inner: &SourceMap) -> BundleResult<SourceMap> {
    let outer_lines = self.decoded()?;
    let inner_lines = inner.decoded()?;

    let mut names: Vec<String> = Vec::new();
    let mut name_index: HashMap<String, u32> = HashMap::new();
    let mut intern = |name: &str| -> u32 {
      if let Some(idx) = name_index.get(name) {
        return *idx;
      }
      let idx = names.len() as u32;
      names.push(name.to_string());
      name_index.insert(name.to_string(), idx);
      idx
    };

    let mut composed: Mappings = Vec::with_capacity(outer_lines.len());
    for line in &outer_lines {
      let mut out_line = Vec::with_capacity(line.len());
      for segment in line {
        let Some(outer_pos) = segment.original else {
          continue;
        };
        let Some(inner_line) = inner_lines.get(outer_pos.line as usize) else {
          continue;
        };
        let hit = inner_line
          .iter()
          .rev()
          .find(|s| s.generated_column <= outer_pos.column)
          .and_then(|s| s.original);
        let Some(inner_pos) = hit else {
          continue;
        };

        let name = inner_pos
          .name
          .and_then(|n| inner.names.get(n as usize))
          .or_else(|| outer_pos.name.and_then(|n| self.names.get(n as usize)))
          .map(|n| intern(n));

        out_line.push(Segment {
          generated_column: segment.generated_column,
          original: Some(SourcePosition { name, ..inner_pos }),
        });
      }
      composed.push(out_line);
    }

    Ok(SourceMap {
      version: 3,
      file: self.file.clone(),
      source_root: inner.source_root.clone(),
      sources: inner.sources.clone(),
      sources_content: inner.sources_content.clone(),
      names,
      mappings: encode_mappings(&composed),
      debug_id: None,
      debug_id_camel: None,
      extra: inner.extra.clone(),
    })
  }
}

fn encode_vlq(out: &mut String, value: i64) {
  let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
  loop {
    let mut digit = (vlq & 0b11111) as usize;
    vlq >>= 5;
    if vlq > 0 {
      digit |= 0b100000;
    }
    out.push(BASE64[digit] as char);
    if vlq == 0 {
      break;
    }
  }
}

fn base64_value(c: u8) -> Option<i64> {
  match c {
    b'A'..=b'Z' => Some((c - b'A') as i64),
    b'a'..=b'z' => Some((c - b'a') as i64 + 26),
    b'0'..=b'9' => Some((c - b'0') as i64 + 52),
    b'+' => Some(62),
    b'/' => Some(63),
    _ => None,
  }
}

fn decode_segment_fields(segment: &str) -> BundleResult<Vec<i64>> {
  let mut fields = Vec::with_capacity(5);
  let mut value: i64 = 0;
  let mut shift = 0;
  for c in segment.bytes() {
    let digit = base64_value(c).ok_or_else(|| BundleError::message(format!("Invalid VLQ character '{}'", c as char)))?;
    value += (digit & 0b11111) << shift;
    if digit & 0b100000 != 0 {
      shift += 5;
      if shift > 60 {
        return Err(BundleError::message("VLQ value overflows"));
      }
    } else {
      let negative = value & 1 == 1;
      value >>= 1;
      fields.push(if negative { -value } else { value });
      value = 0;
      shift = 0;
    }
  }
  if shift != 0 {
    return Err(BundleError::message("Truncated VLQ segment"));
  }
  Ok(fields)
}

/// Encode decoded mappings into the compact `mappings` string
pub fn encode_mappings(lines: &Mappings) -> String {
  let mut out = String::new();
  let (mut prev_source, mut prev_line, mut prev_column, mut prev_name) = (0i64, 0i64, 0i64, 0i64);

  for (line_idx, line) in lines.iter().enumerate() {
    if line_idx > 0 {
      out.push(';');
    }
    let mut prev_generated = 0i64;
    for (seg_idx, segment) in line.iter().enumerate() {
      if seg_idx > 0 {
        out.push(',');
      }
      encode_vlq(&mut out, segment.generated_column as i64 - prev_generated);
      prev_generated = segment.generated_column as i64;

      if let Some(pos) = segment.original {
        encode_vlq(&mut out, pos.source as i64 - prev_source);
        encode_vlq(&mut out, pos.line as i64 - prev_line);
        encode_vlq(&mut out, pos.column as i64 - prev_column);
        prev_source = pos.source as i64;
        prev_line = pos.line as i64;
        prev_column = pos.column as i64;
        if let Some(name) = pos.name {
          encode_vlq(&mut out, name as i64 - prev_name);
          prev_name = name as i64;
        }
      }
    }
  }
  out
}

/// Decode a `mappings` string
pub fn decode_mappings(mappings: &str) -> BundleResult<Mappings> {
  let mut lines = Vec::new();
  let (mut prev_source, mut prev_line, mut prev_column, mut prev_name) = (0i64, 0i64, 0i64, 0i64);

  for line in mappings.split(';') {
    let mut prev_generated = 0i64;
    let mut segments = Vec::new();
    for raw in line.split(',').filter(|s| !s.is_empty()) {
      let fields = decode_segment_fields(raw)?;
      prev_generated += fields[0];
      let original = match fields.len() {
        1 => None,
        4 | 5 => {
          prev_source += fields[1];
          prev_line += fields[2];
          prev_column += fields[3];
          let name = if fields.len() == 5 {
            prev_name += fields[4];
            Some(to_u32(prev_name)?)
          } else {
            None
          };
          Some(SourcePosition {
            source: to_u32(prev_source)?,
            line: to_u32(prev_line)?,
            column: to_u32(prev_column)?,
            name,
          })
        }
        n => return Err(BundleError::message(format!("Mapping segment has {} fields", n))),
      };
      segments.push(Segment {
        generated_column: to_u32(prev_generated)?,
        original,
      });
    }
    lines.push(segments);
  }
  Ok(lines)
}

fn to_u32(value: i64) -> BundleResult<u32> {
  u32::try_from(value).map_err(|_| BundleError::message(format!("Mapping value {} out of range", value)))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn seg(generated_column: u32, line: u32, column: u32) -> Segment {
    Segment {
      generated_column,
      original: Some(SourcePosition {
        source: 0,
        line,
        column,
        name: None,
      }),
    }
  }

  #[test]
  fn test_known_vlq_encoding() {
    // "AAAA" is column 0 -> source 0 line 0 column 0; "SAAS" shifts both columns by 9
    let lines = vec![vec![seg(0, 0, 0), seg(9, 0, 9)]];
    assert_eq!(encode_mappings(&lines), "AAAA,SAAS");
  }

  #[test]
  fn test_decode_handles_negative_and_multi_digit() {
    let lines = vec![vec![seg(40, 3, 100)], vec![seg(2, 1, 0)]];
    let encoded = encode_mappings(&lines);
    assert_eq!(decode_mappings(&encoded).unwrap(), lines);
  }

  #[test]
  fn test_decode_rejects_invalid_characters() {
    assert!(decode_mappings("AA*A").is_err());
    assert!(decode_mappings("g").is_err());
  }

  #[test]
  fn test_unknown_keys_survive() {
    let json = r#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA","x_google_ignoreList":[0]}"#;
    let map = SourceMap::from_json(json).unwrap();
    assert!(map.extra.contains_key("x_google_ignoreList"));
    let out = map.to_json().unwrap();
    assert!(out.contains("x_google_ignoreList"));
  }

  #[test]
  fn test_set_debug_id_writes_both_keys() {
    let mut map = SourceMap::new(None, "a.js", None, &vec![vec![seg(0, 0, 0)]]);
    let id = DebugId::from_content(b"x");
    map.set_debug_id(id);
    let json = map.to_json().unwrap();
    assert!(json.contains(&format!(r#""debug_id":"{}""#, id)));
    assert!(json.contains(&format!(r#""debugId":"{}""#, id)));
  }

  #[test]
  fn test_compose_traces_through_inner_map() {
    // inner: intermediate line 0 col 0 -> original line 5 col 2
    let inner = SourceMap::new(None, "src/app.ts", None, &vec![vec![seg(0, 5, 2)]]);
    // outer: generated line 0 col 10 -> intermediate line 0 col 0
    let outer = SourceMap::new(Some("app.js".into()), "app.js", None, &vec![vec![seg(10, 0, 0)]]);

    let composed = outer.compose(&inner).unwrap();
    assert_eq!(composed.sources, vec!["src/app.ts".to_string()]);
    assert_eq!(composed.file.as_deref(), Some("app.js"));
    assert_eq!(composed.decoded().unwrap(), vec![vec![seg(10, 5, 2)]]);
  }

  #[test]
  fn test_compose_drops_unmapped_segments() {
    let inner = SourceMap::new(None, "src/app.ts", None, &vec![vec![seg(4, 0, 0)]]);
    let outer = SourceMap::new(None, "app.js", None, &vec![vec![seg(0, 0, 1), seg(3, 0, 6)]]);

    let composed = outer.compose(&inner).unwrap();
    assert_eq!(composed.decoded().unwrap(), vec![vec![seg(3, 0, 0)]]);
  }
}
