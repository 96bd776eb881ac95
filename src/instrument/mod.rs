//! Build-time instrumentation
//!
//! Everything here is a pure function of the code handed in: no I/O, no shared state.
//!
//! - **debug_id**: content-derived identifiers
//! - **editor** / **sourcemap**: edits that keep position mappings intact
//! - **snippet** / **prologue**: runtime code and where it goes
//! - **hooks**: the bundler-facing hook trait and chain
//! - **release_injector**, **debug_id_injector**, **metadata_injector**: the hook sets

pub mod debug_id;
pub mod debug_id_injector;
pub mod editor;
pub mod hooks;
pub mod metadata_injector;
pub mod prologue;
pub mod release_injector;
pub mod snippet;
pub mod sourcemap;

pub use debug_id::DebugId;
pub use debug_id_injector::DebugIdInjector;
pub use editor::{MapOptions, MapResolution, TextEditor};
pub use hooks::{BuildHooks, HookChain, ResolvedModule, TransformOutput};
pub use metadata_injector::ModuleMetadataInjector;
pub use release_injector::ReleaseInjector;
pub use sourcemap::SourceMap;
