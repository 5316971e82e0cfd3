//! pagefeed pager library exports.

pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod foreground;
pub mod summary;
pub mod telemetry;

pub use controller::{ControllerOptions, PaginationController};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, SkipReason, TracingSink};
pub use error::PagerError;
pub use foreground::{ForegroundHandle, ForegroundQueue};
