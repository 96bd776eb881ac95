//! Git access used to derive release names
pub mod system_git;

pub use system_git::SystemGit;
