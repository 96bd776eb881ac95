//! Build hook abstraction
//!
//! The host bundler is only ever asked for four things: resolve a module id, load a
//! module, transform a module's code and post-process a rendered chunk. Each injector
//! implements [`BuildHooks`], overriding only the hooks it cares about; the defaults
//! decline.

use crate::core::error::BundleResult;
use crate::instrument::sourcemap::SourceMap;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of claiming a module id in the resolve hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModule {
  pub id: String,
  pub external: bool,
  /// The module must be kept even though nothing imports a binding from it
  pub side_effects: bool,
}

/// Edited code plus a map from the edited code back to the hook's input
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
  pub code: String,
  pub map: SourceMap,
}

/// Hooks a bundler integration forwards to bundle-rail
pub trait BuildHooks: Send + Sync {
  /// Unique name for this hook set (kebab-case)
  fn name(&self) -> &str;

  fn resolve_id(&self, _id: &str) -> Option<ResolvedModule> {
    None
  }

  fn load(&self, _id: &str) -> Option<String> {
    None
  }

  fn transform(&self, _code: &str, _id: &str) -> BundleResult<Option<TransformOutput>> {
    Ok(None)
  }

  fn render_chunk(&self, _code: &str, _file_name: &str) -> BundleResult<Option<TransformOutput>> {
    Ok(None)
  }
}

/// Ordered collection of hook sets
///
/// `resolve_id` and `load` stop at the first hook that claims the id. `transform` and
/// `render_chunk` feed each hook the previous hook's output and compose the maps, so the
/// caller receives one map from the final code back to the code it passed in.
#[derive(Default, Clone)]
pub struct HookChain {
  hooks: Vec<Arc<dyn BuildHooks>>,
}

impl HookChain {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_hook(&mut self, hook: Arc<dyn BuildHooks>) {
    self.hooks.push(hook);
  }

  pub fn hooks(&self) -> &[Arc<dyn BuildHooks>] {
    &self.hooks
  }

  pub fn resolve_id(&self, id: &str) -> Option<ResolvedModule> {
    self.hooks.iter().find_map(|h| h.resolve_id(id))
  }

  pub fn load(&self, id: &str) -> Option<String> {
    self.hooks.iter().find_map(|h| h.load(id))
  }

  pub fn transform(&self, code: &str, id: &str) -> BundleResult<Option<TransformOutput>> {
    self.thread(code, |hook, input| hook.transform(input, id))
  }

  pub fn render_chunk(&self, code: &str, file_name: &str) -> BundleResult<Option<TransformOutput>> {
    self.thread(code, |hook, input| hook.render_chunk(input, file_name))
  }

  fn thread<F>(&self, code: &str, mut apply: F) -> BundleResult<Option<TransformOutput>>
  where
    F: FnMut(&dyn BuildHooks, &str) -> BundleResult<Option<TransformOutput>>,
  {
    let mut current: Option<TransformOutput> = None;
    for hook in &self.hooks {
      let input = current.as_ref().map(|o| o.code.as_str()).unwrap_or(code);
      let Some(output) = apply(hook.as_ref(), input)? else {
        continue;
      };
      current = Some(match current {
        Some(previous) => TransformOutput {
          map: output.map.compose(&previous.map)?,
          code: output.code,
        },
        None => output,
      });
    }
    Ok(current)
  }
}

/// Drop a `?query` or `#hash` suffix from a module id or file name
pub fn strip_query_and_hash(id: &str) -> &str {
  id.split(['?', '#']).next().unwrap_or(id)
}

/// Whether any path segment of `id` is a dependency tree
pub fn is_dependency_path(id: &str) -> bool {
  id.split(['/', '\\']).any(|segment| segment == "node_modules")
}
