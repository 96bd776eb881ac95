//! Runtime snippets written into bundler output
//!
//! Every snippet only touches well-known globals and is wrapped so that a restricted
//! runtime (no `Error.stack`, frozen globals) swallows the failure instead of breaking
//! the host program. The global names are the ones crash-reporting SDKs read at runtime.

use crate::instrument::debug_id::DebugId;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Reserved id of the virtual module carrying the release global
pub const RELEASE_INJECTOR_ID: &str = "\0sentry-release-injector";

/// Marker prefix embedded next to every injected debug ID
pub const DEBUG_ID_MARKER: &str = "sentry-dbid-";

const GLOBAL_OBJECT: &str = r#""undefined"!=typeof window?window:"undefined"!=typeof global?global:"undefined"!=typeof globalThis?globalThis:"undefined"!=typeof self?self:{}"#;

static DEBUG_ID_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"sentry-dbid-([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})")
    .expect("debug id marker pattern is valid")
});

/// Snippet recording `id` in `_sentryDebugIds` under the current stack trace
pub fn debug_id_snippet(id: DebugId) -> String {
  format!(
    r#";!function(){{try{{var e={GLOBAL_OBJECT},n=(new e.Error).stack;n&&(e._sentryDebugIds=e._sentryDebugIds||{{}},e._sentryDebugIds[n]="{id}",e._sentryDebugIdIdentifier="{DEBUG_ID_MARKER}{id}")}}catch(e){{}}}}();"#
  )
}

/// Snippet merging `metadata` into `_sentryModuleMetadata` under the current stack trace
pub fn module_metadata_snippet(metadata: &Value) -> String {
  format!(
    r#";!function(){{try{{var e={GLOBAL_OBJECT},n=(new e.Error).stack;n&&(e._sentryModuleMetadata=e._sentryModuleMetadata||{{}},e._sentryModuleMetadata[n]=Object.assign({{}},e._sentryModuleMetadata[n],{metadata}))}}catch(e){{}}}}();"#
  )
}

/// Body of the virtual release module
pub fn release_injection_code(release: &str, build_info: Option<&Value>) -> String {
  let release_value = serde_json::json!({ "id": release });
  let mut code = format!(
    "var _global = typeof window !== 'undefined' ? window : typeof global !== 'undefined' ? global : typeof globalThis !== 'undefined' ? globalThis : typeof self !== 'undefined' ? self : {{}};\n\n_global.SENTRY_RELEASE={};\n",
    release_value
  );
  if let Some(info) = build_info {
    code.push_str(&format!("_global.SENTRY_BUILD_INFO={};\n", info));
  }
  code
}

/// Statement appended to entry modules so the bundler pulls in the release module
pub fn release_import_statement() -> String {
  format!("\n\n;import {};", Value::String(RELEASE_INJECTOR_ID.to_string()))
}

/// Read back the debug ID a bundle was instrumented with
pub fn extract_debug_id(code: &str) -> Option<DebugId> {
  DEBUG_ID_MARKER_RE
    .captures(code)
    .and_then(|caps| caps.get(1))
    .and_then(|m| m.as_str().to_ascii_lowercase().parse().ok())
}
