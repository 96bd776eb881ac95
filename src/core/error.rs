//! Error types for bundle-rail with contextual messages and exit codes
//!
//! Every failure in the injectors and the release pipeline is expressed as a
//! [`BundleError`]. Whether an error aborts the host build is not decided here;
//! that is the job of [`crate::release::sink::ErrorSink`].

use crate::release::pipeline::StepKind;
use std::any::Any;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for the bundle-rail binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (release CLI, git, I/O)
  System = 2,
  /// A release pipeline step failed
  Pipeline = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for bundle-rail
#[derive(Debug)]
pub enum BundleError {
  /// Configuration errors (detected before the pipeline starts)
  Config(ConfigError),

  /// A release pipeline step failed
  Step(StepError),

  /// Text editor misuse
  Edit(EditError),

  /// Release CLI invocation errors
  Remote(RemoteError),

  /// Git errors while deriving a release name
  Vcs(VcsError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl BundleError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    BundleError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    BundleError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Coerce an arbitrary panic payload into an error
  ///
  /// Backends are user code; anything they unwind with still has to reach the sink
  /// in the same shape as every other failure.
  pub fn unknown(payload: Box<dyn Any + Send>) -> Self {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
      (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
      s.clone()
    } else {
      "<non-string payload>".to_string()
    };
    BundleError::message(format!("An unknown error occurred: {}", detail))
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      BundleError::Message { message, context, help } => BundleError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      BundleError::Io(e) => BundleError::Message {
        message: format!("{}: {}", ctx_str, e),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      BundleError::Config(_) => ExitCode::User,
      BundleError::Step(_) => ExitCode::Pipeline,
      BundleError::Edit(_) => ExitCode::System,
      BundleError::Remote(_) => ExitCode::System,
      BundleError::Vcs(_) => ExitCode::System,
      BundleError::Io(_) => ExitCode::System,
      BundleError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      BundleError::Config(e) => e.help_message(),
      BundleError::Step(e) => e.cause.help_message(),
      BundleError::Remote(e) => e.help_message(),
      BundleError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }

  /// The pipeline step this error came from, if any
  pub fn step(&self) -> Option<StepKind> {
    match self {
      BundleError::Step(e) => Some(e.step),
      _ => None,
    }
  }
}

impl fmt::Display for BundleError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BundleError::Config(e) => write!(f, "{}", e),
      BundleError::Step(e) => write!(f, "{}", e),
      BundleError::Edit(e) => write!(f, "{}", e),
      BundleError::Remote(e) => write!(f, "{}", e),
      BundleError::Vcs(e) => write!(f, "{}", e),
      BundleError::Io(e) => write!(f, "I/O error: {}", e),
      BundleError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for BundleError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      BundleError::Io(e) => Some(e),
      BundleError::Step(e) => Some(e.cause.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for BundleError {
  fn from(err: io::Error) -> Self {
    BundleError::Io(err)
  }
}

impl From<String> for BundleError {
  fn from(msg: String) -> Self {
    BundleError::message(msg)
  }
}

impl From<&str> for BundleError {
  fn from(msg: &str) -> Self {
    BundleError::message(msg)
  }
}

impl From<ConfigError> for BundleError {
  fn from(err: ConfigError) -> Self {
    BundleError::Config(err)
  }
}

impl From<EditError> for BundleError {
  fn from(err: EditError) -> Self {
    BundleError::Edit(err)
  }
}

impl From<RemoteError> for BundleError {
  fn from(err: RemoteError) -> Self {
    BundleError::Remote(err)
  }
}

impl From<VcsError> for BundleError {
  fn from(err: VcsError) -> Self {
    BundleError::Vcs(err)
  }
}

impl From<StepError> for BundleError {
  fn from(err: StepError) -> Self {
    BundleError::Step(err)
  }
}

impl From<toml_edit::de::Error> for BundleError {
  fn from(err: toml_edit::de::Error) -> Self {
    BundleError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for BundleError {
  fn from(err: serde_json::Error) -> Self {
    BundleError::message(format!("JSON error: {}", err))
  }
}

impl From<regex::Error> for BundleError {
  fn from(err: regex::Error) -> Self {
    BundleError::message(format!("Regex error: {}", err))
  }
}

impl From<glob::PatternError> for BundleError {
  fn from(err: glob::PatternError) -> Self {
    BundleError::message(format!("Invalid glob pattern: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for BundleError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    BundleError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for BundleError {
  fn from(err: std::path::StripPrefixError) -> Self {
    BundleError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Convert anyhow::Error to BundleError (backends written against anyhow)
impl From<anyhow::Error> for BundleError {
  fn from(err: anyhow::Error) -> Self {
    BundleError::message(err.to_string())
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// bundle-rail.toml not found
  NotFound { search_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// Field present but unusable
  Invalid { field: String, reason: String },

  /// No release name configured and none derivable from CI or git
  ReleaseNameUnresolved,
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create bundle-rail.toml in the project root or pass --config <path>.".to_string())
      }
      ConfigError::ReleaseNameUnresolved => Some(
        "Set `release.name` in bundle-rail.toml, export SENTRY_RELEASE, or run inside a git repository.".to_string(),
      ),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { search_root } => {
        write!(
          f,
          "No bundle-rail configuration found.\nExpected file: {}/bundle-rail.toml",
          search_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::Invalid { field, reason } => {
        write!(f, "Invalid value for '{}': {}", field, reason)
      }
      ConfigError::ReleaseNameUnresolved => {
        write!(f, "Could not determine a release name")
      }
    }
  }
}

/// A failed release pipeline step
#[derive(Debug)]
pub struct StepError {
  pub step: StepKind,
  pub release: String,
  pub cause: Box<BundleError>,
}

impl StepError {
  pub fn new(step: StepKind, release: impl Into<String>, cause: BundleError) -> Self {
    Self {
      step,
      release: release.into(),
      cause: Box::new(cause),
    }
  }
}

impl fmt::Display for StepError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Release step '{}' failed for release '{}': {}",
      self.step, self.release, self.cause
    )
  }
}

/// Text editor misuse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
  /// Pattern matched the empty string; use prepend instead
  EmptyMatch { pattern: String },

  /// Replacement range collides with an earlier edit
  Overlap { start: usize, end: usize },

  /// Offset past the end of the buffer or inside a UTF-8 sequence
  OutOfBounds { offset: usize, len: usize },
}

impl fmt::Display for EditError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EditError::EmptyMatch { pattern } => {
        write!(f, "Cannot replace a zero-length match of /{}/; prepend instead", pattern)
      }
      EditError::Overlap { start, end } => {
        write!(f, "Edit at {}..{} overlaps an earlier edit", start, end)
      }
      EditError::OutOfBounds { offset, len } => {
        write!(f, "Offset {} is not a valid position in a buffer of {} bytes", offset, len)
      }
    }
  }
}

/// Release CLI invocation errors
#[derive(Debug)]
pub enum RemoteError {
  /// Release CLI binary could not be started
  BinaryNotFound { binary: String },

  /// Release CLI exited with a failure status
  CommandFailed { command: String, stderr: String },
}

impl RemoteError {
  fn help_message(&self) -> Option<String> {
    match self {
      RemoteError::BinaryNotFound { binary } => Some(format!(
        "Install '{}' or point `cli.binary` in bundle-rail.toml at it.",
        binary
      )),
      RemoteError::CommandFailed { stderr, .. } => {
        if stderr.contains("401") || stderr.to_lowercase().contains("auth") {
          Some("Check the auth token (`cli.auth_token` or SENTRY_AUTH_TOKEN).".to_string())
        } else {
          None
        }
      }
    }
  }
}

impl fmt::Display for RemoteError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RemoteError::BinaryNotFound { binary } => write!(f, "Release CLI '{}' could not be started", binary),
      RemoteError::CommandFailed { command, stderr } => {
        write!(f, "Release CLI command failed: {}\n{}", command, stderr.trim_end())
      }
    }
  }
}

/// Git errors
#[derive(Debug)]
pub enum VcsError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },
}

impl fmt::Display for VcsError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VcsError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      VcsError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
    }
  }
}

/// Result type alias for bundle-rail
pub type BundleResult<T> = Result<T, BundleError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> BundleResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> BundleResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<BundleError>,
{
  fn context(self, ctx: impl Into<String>) -> BundleResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> BundleResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &BundleError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
