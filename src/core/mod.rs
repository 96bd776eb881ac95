//! Core building blocks shared by every bundle-rail operation
//!
//! - **config**: bundle-rail.toml parsing and validation
//! - **error**: error types with contextual help messages and exit codes
//! - **vcs**: git access (SystemGit)

pub mod config;
pub mod error;
pub mod vcs;
