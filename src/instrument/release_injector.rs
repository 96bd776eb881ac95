//! Release-name injection through a virtual module
//!
//! Entry modules get an import of a synthetic module appended. The bundler resolves that
//! import back to this injector, which serves a module setting the release global. Import
//! declarations hoist, so appending changes nothing about evaluation order while leaving
//! every existing mapping of the module untouched.

use crate::core::error::BundleResult;
use crate::instrument::editor::{MapOptions, MapResolution, TextEditor};
use crate::instrument::hooks::{BuildHooks, ResolvedModule, TransformOutput, is_dependency_path, strip_query_and_hash};
use crate::instrument::snippet::{RELEASE_INJECTOR_ID, release_import_statement, release_injection_code};
use glob::Pattern;
use serde_json::Value;

/// Source extensions eligible for the appended import
const SOURCE_EXTENSIONS: &[&str] = &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs", ".mts", ".cts"];

/// Injects the release name into every instrumented module graph
#[derive(Debug, Clone)]
pub struct ReleaseInjector {
  release: String,
  build_info: Option<Value>,
  targets: Vec<Pattern>,
  resolution: MapResolution,
}

impl ReleaseInjector {
  /// Create an injector for `release`
  ///
  /// `targets` are glob patterns over module ids; when empty, every eligible module
  /// receives the import.
  pub fn new(release: impl Into<String>, build_info: Option<Value>, targets: &[String]) -> BundleResult<Self> {
    let targets = targets
      .iter()
      .map(|t| Pattern::new(t))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self {
      release: release.into(),
      build_info,
      targets,
      resolution: MapResolution::default(),
    })
  }

  pub fn with_resolution(mut self, resolution: MapResolution) -> Self {
    self.resolution = resolution;
    self
  }

  pub fn release(&self) -> &str {
    &self.release
  }

  pub fn resolve(&self, module_id: &str) -> Option<ResolvedModule> {
    (module_id == RELEASE_INJECTOR_ID).then(|| ResolvedModule {
      id: RELEASE_INJECTOR_ID.to_string(),
      external: false,
      side_effects: true,
    })
  }

  pub fn load(&self, module_id: &str) -> Option<String> {
    (module_id == RELEASE_INJECTOR_ID).then(|| release_injection_code(&self.release, self.build_info.as_ref()))
  }

  /// Whether `module_id` should receive the release import
  pub fn should_transform(&self, module_id: &str) -> bool {
    if module_id == RELEASE_INJECTOR_ID || module_id.starts_with('\0') {
      return false;
    }
    if is_dependency_path(module_id) {
      return false;
    }

    let path = strip_query_and_hash(module_id);
    if !SOURCE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
      return false;
    }

    self.targets.is_empty() || self.targets.iter().any(|p| p.matches(path))
  }

  pub fn transform(&self, code: &str, module_id: &str) -> BundleResult<Option<TransformOutput>> {
    if !self.should_transform(module_id) {
      return Ok(None);
    }

    let mut editor = TextEditor::new(code);
    editor.append(release_import_statement());
    tracing::debug!(module = module_id, release = %self.release, "appended release import");

    Ok(Some(TransformOutput {
      code: editor.to_string(),
      map: editor.generate_map(&MapOptions {
        file: Some(module_id.to_string()),
        source: module_id.to_string(),
        include_content: true,
        resolution: self.resolution,
      }),
    }))
  }
}

impl BuildHooks for ReleaseInjector {
  fn name(&self) -> &str {
    "release-injection"
  }

  fn resolve_id(&self, id: &str) -> Option<ResolvedModule> {
    self.resolve(id)
  }

  fn load(&self, id: &str) -> Option<String> {
    ReleaseInjector::load(self, id)
  }

  fn transform(&self, code: &str, id: &str) -> BundleResult<Option<TransformOutput>> {
    ReleaseInjector::transform(self, code, id)
  }
}
