use bundle_rail::core::error::{BundleResult, ResultExt};
use bundle_rail::instrument::DebugId;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct IdEntry<'a> {
  path: &'a Path,
  debug_id: DebugId,
}

/// Run the id command
pub fn run_id(files: &[PathBuf], json: bool) -> BundleResult<()> {
  let mut entries = Vec::with_capacity(files.len());
  for file in files {
    let content = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    entries.push(IdEntry {
      path: file,
      debug_id: DebugId::from_content(&content),
    });
  }

  if json {
    println!("{}", serde_json::to_string_pretty(&entries)?);
  } else {
    for entry in &entries {
      println!("{}  {}", entry.debug_id, entry.path.display());
    }
  }
  Ok(())
}
