//! Shared diagnostics sink for recoverable errors.
//!
//! Per-entry filesystem failures (permission denied, vanished file,
//! unreadable symlink target) and configuration parse failures are
//! recovered locally: the entry or source is skipped and a diagnostic is
//! recorded here. A run that only hit these still produces a complete,
//! usable index.

use parking_lot::Mutex;
use std::sync::Arc;
use strata_core::RepoPath;

/// A single recoverable problem encountered during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Repository path the problem relates to, when known
    pub path: Option<RepoPath>,
    /// Human-readable description
    pub message: String,
}

/// Append-only, thread-safe diagnostic collection.
///
/// Cheap to clone; all clones share the same underlying list, so the
/// caller hands one sink to the walker, the index builder and the module
/// resolver and reads everything back afterwards.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. Also logged at warn level.
    pub fn report(&self, path: Option<RepoPath>, message: impl Into<String>) {
        let message = message.into();
        match &path {
            Some(p) => tracing::warn!(path = %p, "{}", message),
            None => tracing::warn!("{}", message),
        }
        self.inner.lock().push(Diagnostic { path, message });
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drain all recorded diagnostics.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Snapshot of recorded diagnostics without draining.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.inner.lock().clone()
    }
}
