//! Artifact discovery and debug ID upload preparation

pub mod prepare;
pub mod walk;

pub use prepare::{PreparedArtifact, prepare_bundles};
pub use walk::{collect_assets, collect_files};
