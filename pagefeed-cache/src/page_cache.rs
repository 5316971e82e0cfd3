//! Keyed store of page streams.
//!
//! Keys are zero-based page indices. Entries are created on the first
//! successful refresh of an index and never removed; the memory bound is the
//! number of distinct pages visited in a session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use pagefeed_core::{ObservableValue, PageRecord};

use crate::clock::Clock;
use crate::entry::{EntryState, PageCacheEntry};

/// How long a refreshed page stays valid. Mirrors the feed API's own cache
/// lifetime (5 minutes).
pub const PAGE_TTL: Duration = Duration::from_secs(5 * 60);

/// Counters describing cache traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// `try_get_valid` calls that returned a stream.
    pub hits: u64,
    /// `try_get_valid` calls that returned nothing.
    pub misses: u64,
    /// Entries latched invalid because their deadline passed.
    pub expirations: u64,
    /// `mark_refreshed` calls.
    pub refreshes: u64,
    /// Distinct indices currently held.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Self-invalidating cache of page streams.
///
/// Not internally synchronized; the owner serializes access.
pub struct PageCache {
    entries: HashMap<usize, PageCacheEntry>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    stats: CacheStats,
}

impl PageCache {
    /// Create an empty cache reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
            ttl: TimeDelta::from_std(PAGE_TTL).unwrap_or(TimeDelta::MAX),
            stats: CacheStats::default(),
        }
    }

    /// The stream for `index` if it was refreshed less than [`PAGE_TTL`] ago
    /// and has not been invalidated.
    ///
    /// An entry found past its deadline is latched invalid here; this is the
    /// only place expiry happens.
    pub fn try_get_valid(&mut self, index: usize) -> Option<ObservableValue<PageRecord>> {
        let now = self.clock.now();
        let Some(entry) = self.entries.get_mut(&index) else {
            self.stats.misses += 1;
            return None;
        };

        if entry.expire_if_due(now) {
            self.stats.expirations += 1;
            tracing::debug!(page_index = index, expired_at = %entry.expires_at(), "Page cache entry expired");
        }

        match entry.state_at(now) {
            EntryState::Valid => {
                self.stats.hits += 1;
                Some(entry.stream().clone())
            }
            EntryState::Expired => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// The stream for `index` regardless of validity, or `None` if the index
    /// was never refreshed.
    pub fn get_even_if_invalid(&self, index: usize) -> Option<ObservableValue<PageRecord>> {
        self.entries.get(&index).map(|entry| entry.stream().clone())
    }

    /// Record a successful fetch for `index`.
    ///
    /// An existing entry is revalidated and keeps its original stream; `stream`
    /// is only stored when the index is new.
    pub fn mark_refreshed(&mut self, index: usize, stream: &ObservableValue<PageRecord>) {
        let now = self.clock.now();
        let expires_at = self.deadline_from(now);
        self.stats.refreshes += 1;

        match self.entries.get_mut(&index) {
            Some(entry) => entry.refresh(now, expires_at),
            None => {
                self.entries
                    .insert(index, PageCacheEntry::new(stream.clone(), now, expires_at));
                self.stats.entry_count = self.entries.len() as u64;
            }
        }
    }

    /// Force the next `try_get_valid(index)` to miss. The stream is kept.
    ///
    /// Returns false if the index is not cached.
    pub fn invalidate(&mut self, index: usize) -> bool {
        match self.entries.get_mut(&index) {
            Some(entry) => {
                entry.invalidate();
                true
            }
            None => false,
        }
    }

    /// Validity of `index` right now, without latching expiry.
    pub fn state(&self, index: usize) -> Option<EntryState> {
        let now = self.clock.now();
        self.entries.get(&index).map(|entry| entry.state_at(now))
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    fn deadline_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut indices: Vec<_> = self.entries.keys().copied().collect();
        indices.sort_unstable();
        f.debug_struct("PageCache")
            .field("indices", &indices)
            .field("ttl", &self.ttl)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StepClock(Mutex<DateTime<Utc>>);

    impl StepClock {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Utc::now())))
        }

        fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now += TimeDelta::seconds(secs);
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn stream() -> ObservableValue<PageRecord> {
        ObservableValue::new(PageRecord::placeholder())
    }

    #[test]
    fn test_unknown_index_misses_both_lookups() {
        let mut cache = PageCache::new(StepClock::new());
        assert!(cache.try_get_valid(3).is_none());
        assert!(cache.get_even_if_invalid(3).is_none());
        assert_eq!(cache.stats().misses, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_refreshed_entry_hits_until_ttl() {
        let clock = StepClock::new();
        let mut cache = PageCache::new(clock.clone());
        let page = stream();
        cache.mark_refreshed(0, &page);

        clock.advance(299);
        let hit = cache.try_get_valid(0).expect("valid within ttl");
        assert!(ObservableValue::ptr_eq(&hit, &page));

        clock.advance(1);
        assert!(cache.try_get_valid(0).is_none());
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.state(0), Some(EntryState::Expired));
    }

    #[test]
    fn test_expired_entry_still_hands_out_its_stream() {
        let clock = StepClock::new();
        let mut cache = PageCache::new(clock.clone());
        let page = stream();
        cache.mark_refreshed(4, &page);

        clock.advance(400);
        assert!(cache.try_get_valid(4).is_none());
        let stale = cache.get_even_if_invalid(4).expect("entry kept after expiry");
        assert!(ObservableValue::ptr_eq(&stale, &page));
    }

    #[test]
    fn test_refresh_keeps_original_stream() {
        let clock = StepClock::new();
        let mut cache = PageCache::new(clock.clone());
        let original = stream();
        cache.mark_refreshed(1, &original);

        clock.advance(301);
        assert!(cache.try_get_valid(1).is_none());

        let stranger = stream();
        cache.mark_refreshed(1, &stranger);
        let revalidated = cache.try_get_valid(1).expect("revalidated");
        assert!(ObservableValue::ptr_eq(&revalidated, &original));
        assert!(!ObservableValue::ptr_eq(&revalidated, &stranger));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_miss() {
        let mut cache = PageCache::new(StepClock::new());
        cache.mark_refreshed(2, &stream());

        assert!(cache.invalidate(2));
        assert!(!cache.invalidate(9));
        assert!(cache.try_get_valid(2).is_none());
        assert!(cache.get_even_if_invalid(2).is_some());
    }

    #[test]
    fn test_stats_track_traffic() {
        let mut cache = PageCache::new(StepClock::new());
        cache.mark_refreshed(0, &stream());
        cache.mark_refreshed(1, &stream());
        let _ = cache.try_get_valid(0);
        let _ = cache.try_get_valid(1);
        let _ = cache.try_get_valid(2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.refreshes, 2);
        assert_eq!(stats.entry_count, 2);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 0.001);
        assert!((CacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_ttl_matches_api_cache_lifetime() {
        let cache = PageCache::new(StepClock::new());
        assert_eq!(cache.ttl(), TimeDelta::seconds(300));
    }
}
