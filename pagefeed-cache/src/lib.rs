//! Page cache with lazy, time-based expiry.
//!
//! Each visited page index owns one stream ([`ObservableValue<PageRecord>`]).
//! The stream is never replaced: when an entry goes stale the cache stops
//! reporting it as valid, but the same stream is handed back for the refresh
//! to publish into. Consumers that subscribed early therefore keep receiving
//! data across any number of expiry/refresh cycles.
//!
//! Expiry is checked on read against a [`Clock`]; there is no timer or sweep.
//!
//! [`ObservableValue<PageRecord>`]: pagefeed_core::ObservableValue
//! [`PageRecord`]: pagefeed_core::PageRecord

pub mod clock;
pub mod entry;
pub mod page_cache;

pub use clock::{Clock, SystemClock};
pub use entry::{EntryState, PageCacheEntry};
pub use page_cache::{CacheStats, PageCache, PAGE_TTL};
