//! bundle-rail: content-addressed debug IDs and release reconciliation for bundler output
//!
//! - **core**: configuration, errors and git access
//! - **instrument**: build-time injection of debug IDs, release names and module metadata
//! - **release**: the post-build release pipeline and its error sink
//! - **upload**: artifact discovery and debug ID upload preparation
//! - **plugin**: the bundler-facing facade tying the above together

pub mod core;
pub mod instrument;
pub mod plugin;
pub mod release;
pub mod upload;

pub use plugin::BundlePlugin;
