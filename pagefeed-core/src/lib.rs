//! pagefeed Core - Page data types and propagation primitive
//!
//! Pure data structures plus [`ObservableValue`], the replay-latest cell every
//! other crate uses to hand page data to consumers. No I/O lives here.

pub mod error;
pub mod format;
pub mod model;
pub mod observable;

pub use error::{FeedError, FeedErrorKind, FeedResult};
pub use format::short_form;
pub use model::{Author, ImageRecord, ImageVariant, PageRecord};
pub use observable::{ObservableValue, Subscription};
