//! CLI commands for bundle-rail
//!
//! - **id**: print content-derived debug IDs
//! - **inject**: instrument built files on disk, rebasing their existing source maps
//! - **prepare**: copy instrumented bundles into a debug-ID-keyed upload folder
//! - **release**: run the release pipeline against the release CLI (or a dry run)

pub mod id;
pub mod inject;
pub mod prepare;
pub mod release;

pub use id::run_id;
pub use inject::run_inject;
pub use prepare::run_prepare;
pub use release::run_release;

use bundle_rail::core::config::BundleConfig;
use bundle_rail::core::error::BundleResult;
use std::path::Path;

/// Load and validate the explicit config file, else search `dir`, else fall back to defaults
///
/// For commands without an error policy: invalid options fail the command.
pub(crate) fn load_config_or_default(dir: &Path, explicit: Option<&Path>) -> BundleResult<BundleConfig> {
  let config = match explicit {
    Some(path) => BundleConfig::load_file(path)?,
    None if BundleConfig::exists(dir) => BundleConfig::load(dir)?,
    None => BundleConfig::default(),
  };
  config.validate()?;
  Ok(config)
}

/// Load the explicit config file or the one found in `dir`, without validating options
pub(crate) fn load_config(dir: &Path, explicit: Option<&Path>) -> BundleResult<BundleConfig> {
  match explicit {
    Some(path) => BundleConfig::load_file(path),
    None => BundleConfig::load(dir),
  }
}
