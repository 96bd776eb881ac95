//! Progress indicators for long-running operations
//!
//! Uses `linya`, whose bars can be driven from many threads at once. Bars are hidden in
//! JSON mode so stdout stays machine-readable.

use linya::{Bar, Progress};
use std::sync::{Arc, Mutex};

/// Thread-safe progress bar for file operations
#[derive(Clone)]
pub struct FileProgress {
  inner: Option<Arc<(Mutex<Progress>, Bar)>>,
}

impl FileProgress {
  /// Create a new progress bar over `total` files
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner: Some(Arc::new((Mutex::new(progress), bar))),
    }
  }

  /// A bar that never draws
  pub fn hidden() -> Self {
    Self { inner: None }
  }

  /// Increment progress by 1
  pub fn inc(&self) {
    if let Some(inner) = &self.inner
      && let Ok(mut progress) = inner.0.lock()
    {
      progress.inc_and_draw(&inner.1, 1);
    }
  }
}
