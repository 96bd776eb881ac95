//! Release management
//!
//! After a build, the release named by [`name::detect_release_name`] is created,
//! populated and finalized through a [`backend::ReleaseBackend`]:
//!
//! - **pipeline**: ordered step table and its runner
//! - **sink**: raise-or-delegate routing of recoverable failures
//! - **backend**: the remote collaborator interface plus a dry-run recorder
//! - **cli_backend**: backend shelling out to the release-management CLI
//! - **name**: release name detection from config, CI environment and git

pub mod backend;
pub mod cli_backend;
pub mod name;
pub mod pipeline;
pub mod sink;

pub use backend::{DryRunBackend, ReleaseBackend, SourceMapUpload, UploadGroup};
pub use cli_backend::CliBackend;
pub use pipeline::{PipelineReport, ReleasePipeline, StepKind, StepStatus};
pub use sink::{ErrorPolicy, ErrorSink};
