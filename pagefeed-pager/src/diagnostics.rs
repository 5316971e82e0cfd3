//! Out-of-band reporting for fetches that never reach a page stream.
//!
//! A failed fetch is never published to consumers. It is recorded here
//! instead, so callers that care can still see what went wrong.

use std::sync::{Mutex, MutexGuard, PoisonError};

use pagefeed_core::{FeedError, FeedErrorKind};

/// Why a fetch was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another fetch for the same page had not completed yet.
    AlreadyInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A fetch completed with an error and was dropped.
    FetchAbandoned {
        feature: String,
        page_index: usize,
        error: FeedError,
    },
    /// A fetch was suppressed before it started.
    FetchSkipped {
        feature: String,
        page_index: usize,
        reason: SkipReason,
    },
}

impl Diagnostic {
    pub fn page_index(&self) -> usize {
        match self {
            Diagnostic::FetchAbandoned { page_index, .. }
            | Diagnostic::FetchSkipped { page_index, .. } => *page_index,
        }
    }

    pub fn error_kind(&self) -> Option<FeedErrorKind> {
        match self {
            Diagnostic::FetchAbandoned { error, .. } => Some(error.kind),
            Diagnostic::FetchSkipped { .. } => None,
        }
    }
}

/// Receiver of [`Diagnostic`] events. Called from background tasks.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: Diagnostic) {
        match event {
            Diagnostic::FetchAbandoned {
                feature,
                page_index,
                error,
            } => {
                tracing::warn!(
                    feature = %feature,
                    page_index,
                    kind = %error.kind,
                    status = ?error.status,
                    error = %error.message,
                    "Page fetch abandoned"
                );
            }
            Diagnostic::FetchSkipped {
                feature,
                page_index,
                reason,
            } => {
                tracing::debug!(
                    feature = %feature,
                    page_index,
                    reason = ?reason,
                    "Page fetch skipped"
                );
            }
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn events_guard(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events_guard().clone()
    }

    pub fn len(&self) -> usize {
        self.events_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events_guard().is_empty()
    }

    /// Error kinds of abandoned fetches, in arrival order.
    pub fn abandoned_kinds(&self) -> Vec<FeedErrorKind> {
        self.events_guard()
            .iter()
            .filter_map(Diagnostic::error_kind)
            .collect()
    }

    pub fn clear(&self) {
        self.events_guard().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: Diagnostic) {
        self.events_guard().push(event);
    }
}
