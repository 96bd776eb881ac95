//! Recoverable-error sink
//!
//! Every failure the injectors or the pipeline consider survivable passes through
//! [`ErrorSink::handle`]. The policy is chosen once, when the sink is built.

use crate::core::error::{BundleError, BundleResult};
use std::fmt;
use std::sync::Arc;

/// Callback receiving delegated errors
pub type ErrorHandler = Arc<dyn Fn(&BundleError) + Send + Sync>;

/// What to do with a recoverable failure
#[derive(Clone, Default)]
pub enum ErrorPolicy {
  /// Return the error to the caller, aborting the build
  #[default]
  Raise,
  /// Hand the error to a callback and carry on
  Delegate(ErrorHandler),
}

impl ErrorPolicy {
  pub fn delegate<F>(handler: F) -> Self
  where
    F: Fn(&BundleError) + Send + Sync + 'static,
  {
    ErrorPolicy::Delegate(Arc::new(handler))
  }
}

impl fmt::Debug for ErrorPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorPolicy::Raise => write!(f, "Raise"),
      ErrorPolicy::Delegate(_) => write!(f, "Delegate(..)"),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
  policy: ErrorPolicy,
}

impl ErrorSink {
  pub fn new(policy: ErrorPolicy) -> Self {
    Self { policy }
  }

  pub fn is_raising(&self) -> bool {
    matches!(self.policy, ErrorPolicy::Raise)
  }

  /// Route `error` according to the policy
  ///
  /// Returns `Ok(())` once a delegate has seen the error, or the error itself under
  /// [`ErrorPolicy::Raise`].
  pub fn handle(&self, error: impl Into<BundleError>) -> BundleResult<()> {
    let error = error.into();
    match &self.policy {
      ErrorPolicy::Raise => Err(error),
      ErrorPolicy::Delegate(handler) => {
        tracing::warn!(error = %error, "delegating recoverable error");
        handler(&error);
        Ok(())
      }
    }
  }
}
