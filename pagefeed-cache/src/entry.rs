//! A single cached page stream with its validity window.

use chrono::{DateTime, Utc};
use pagefeed_core::{ObservableValue, PageRecord};

/// Validity of a cache entry as of some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Refreshed within the TTL window.
    Valid,
    /// The TTL window has passed (or the entry was invalidated).
    Expired,
}

/// One page index's stream plus its validity flag and deadline.
///
/// The entry owns its stream for the life of the cache; consumers hold clones.
#[derive(Debug, Clone)]
pub struct PageCacheEntry {
    stream: ObservableValue<PageRecord>,
    valid: bool,
    refreshed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl PageCacheEntry {
    /// Wrap `stream` as freshly refreshed at `now`.
    pub fn new(stream: ObservableValue<PageRecord>, now: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            stream,
            valid: true,
            refreshed_at: now,
            expires_at,
        }
    }

    pub fn stream(&self) -> &ObservableValue<PageRecord> {
        &self.stream
    }

    /// Validity at `now`, without mutating the entry.
    pub fn state_at(&self, now: DateTime<Utc>) -> EntryState {
        if self.valid && now < self.expires_at {
            EntryState::Valid
        } else {
            EntryState::Expired
        }
    }

    /// Validity at `now`, latching the entry invalid once its deadline passed.
    ///
    /// Returns true if the entry was valid and has just been latched.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.valid && now >= self.expires_at {
            self.valid = false;
            return true;
        }
        false
    }

    /// Mark valid again with a new deadline.
    pub fn refresh(&mut self, now: DateTime<Utc>, expires_at: DateTime<Utc>) {
        self.valid = true;
        self.refreshed_at = now;
        self.expires_at = expires_at;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
