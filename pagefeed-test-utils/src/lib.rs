//! pagefeed Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - A scriptable [`MockFeedClient`] that records every request
//! - A [`ManualClock`] for driving cache expiry by hand
//! - Fixtures for pages and images
//! - Proptest generators

pub use pagefeed_cache::{Clock, PageCache, PAGE_TTL};
pub use pagefeed_client::{FeedClient, FeedRequest};
pub use pagefeed_core::{
    Author, FeedError, FeedErrorKind, FeedResult, ImageRecord, ImageVariant, ObservableValue,
    PageRecord,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// CLOCK
// ============================================================================

/// A [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    /// A clock frozen at a fixed, arbitrary instant.
    pub fn frozen() -> Arc<Self> {
        Self::new(DateTime::from_timestamp(1_595_000_000, 0).unwrap_or_else(Utc::now))
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::zero());
        *lock(&self.now) += delta;
    }

    pub fn advance_secs(&self, secs: i64) {
        *lock(&self.now) += TimeDelta::seconds(secs);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *lock(&self.now) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

// ============================================================================
// MOCK FEED CLIENT
// ============================================================================

struct Step {
    delay: Duration,
    outcome: FeedResult<PageRecord>,
}

/// Scriptable [`FeedClient`].
///
/// Each page index has a queue of scripted outcomes, consumed one per call.
/// With an empty queue the mock answers with [`fixtures::page`] for the
/// configured total page count. Every request is recorded.
pub struct MockFeedClient {
    total_pages: Mutex<usize>,
    scripts: Mutex<HashMap<usize, VecDeque<Step>>>,
    failing: Mutex<Option<FeedErrorKind>>,
    calls: Mutex<Vec<FeedRequest>>,
}

impl MockFeedClient {
    pub fn new(total_pages: usize) -> Arc<Self> {
        Arc::new(Self {
            total_pages: Mutex::new(total_pages),
            scripts: Mutex::new(HashMap::new()),
            failing: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Change the page count reported by unscripted responses.
    pub fn set_total_pages(&self, total_pages: usize) {
        *lock(&self.total_pages) = total_pages;
    }

    /// Queue `outcome` for the next request of `index`.
    pub fn script(&self, index: usize, outcome: FeedResult<PageRecord>) {
        self.script_delayed(index, Duration::ZERO, outcome);
    }

    /// Queue `outcome` for `index`, delivered after `delay`.
    pub fn script_delayed(&self, index: usize, delay: Duration, outcome: FeedResult<PageRecord>) {
        lock(&self.scripts)
            .entry(index)
            .or_default()
            .push_back(Step { delay, outcome });
    }

    /// Queue a failure of `kind` for the next request of `index`.
    pub fn script_failure(&self, index: usize, kind: FeedErrorKind) {
        self.script(index, Err(fixtures::error(kind)));
    }

    /// Fail every unscripted request with `kind` (or stop failing with `None`).
    pub fn fail_all(&self, kind: Option<FeedErrorKind>) {
        *lock(&self.failing) = kind;
    }

    pub fn calls(&self) -> Vec<FeedRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of requests made for zero-based `index`.
    pub fn calls_for(&self, index: usize) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|request| request.page_index() == index)
            .count()
    }

    /// Distinct zero-based indices requested, sorted.
    pub fn requested_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = lock(&self.calls)
            .iter()
            .map(FeedRequest::page_index)
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }
}

#[async_trait]
impl FeedClient for MockFeedClient {
    async fn fetch_page(&self, request: &FeedRequest) -> FeedResult<PageRecord> {
        lock(&self.calls).push(request.clone());

        let index = request.page_index();
        let step = lock(&self.scripts)
            .get_mut(&index)
            .and_then(VecDeque::pop_front);

        let (delay, outcome) = match step {
            Some(step) => (step.delay, step.outcome),
            None => {
                let outcome = match *lock(&self.failing) {
                    Some(kind) => Err(fixtures::error(kind)),
                    None => Ok(fixtures::page(
                        &request.feature,
                        index,
                        *lock(&self.total_pages),
                    )),
                };
                (Duration::ZERO, outcome)
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.

    use super::*;

    /// Images per fixture page.
    pub const ITEMS_PER_PAGE: usize = 3;

    /// A deterministic image whose fields are derived from `n`.
    pub fn image(n: usize) -> ImageRecord {
        ImageRecord {
            title: format!("Photo {}", n),
            author: Author {
                username: format!("user{}", n),
                fullname: format!("User Number {}", n),
                userpic_url: format!("https://pics/user{}.jpg", n),
                cover_url: None,
            },
            created_at: "2020-07-18T10:11:12-04:00".to_string(),
            description: format!("Description of photo {}", n),
            times_viewed: (n as i64) * 1000,
            votes_count: n as i64 * 10,
            positive_votes_count: n as i64 * 9,
            comments_count: n as i64,
            variants: vec![ImageVariant {
                format: "jpeg".to_string(),
                size: 2,
                url: format!("http://img/{}", n),
                https_url: format!("https://img/{}", n),
            }],
        }
    }

    /// Page `index` (zero-based) of a feed with `total_pages` pages.
    pub fn page(feature: &str, index: usize, total_pages: usize) -> PageRecord {
        PageRecord {
            page_index: index,
            total_pages,
            total_items: (total_pages * ITEMS_PER_PAGE) as u64,
            feature: feature.to_string(),
            items: (0..ITEMS_PER_PAGE)
                .map(|i| image(index * ITEMS_PER_PAGE + i))
                .collect(),
        }
    }

    /// A [`FeedError`] of `kind` with a canned message.
    pub fn error(kind: FeedErrorKind) -> FeedError {
        match kind {
            FeedErrorKind::MissingCredential => FeedError::missing_credential(),
            FeedErrorKind::TransportFailure => FeedError::transport("connection reset by peer"),
            FeedErrorKind::HttpStatusFailure => FeedError::http_status(500, "internal error"),
            FeedErrorKind::EmptyBody => FeedError::empty_body(),
            FeedErrorKind::DecodeFailure => FeedError::decode("expected value at line 1 column 1"),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for pagefeed records.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_feed_error_kind() -> impl Strategy<Value = FeedErrorKind> {
        prop::sample::select(FeedErrorKind::ALL.to_vec())
    }

    pub fn arb_feature() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("popular".to_string()),
            Just("upcoming".to_string()),
            Just("fresh_today".to_string()),
            "[a-z_]{1,16}",
        ]
    }

    pub fn arb_image_variant() -> impl Strategy<Value = ImageVariant> {
        ("[a-z]{3,4}", 1u32..40, "[a-z0-9]{1,12}").prop_map(|(format, size, slug)| ImageVariant {
            format,
            size,
            url: format!("http://img/{}", slug),
            https_url: format!("https://img/{}", slug),
        })
    }

    pub fn arb_image_record() -> impl Strategy<Value = ImageRecord> {
        (
            "[A-Za-z ]{0,24}",
            "[a-z0-9]{1,12}",
            0i64..10_000_000,
            0i64..100_000,
            prop::collection::vec(arb_image_variant(), 0..4),
        )
            .prop_map(|(title, username, times_viewed, votes, variants)| ImageRecord {
                title,
                author: Author {
                    username: username.clone(),
                    fullname: username,
                    ..Default::default()
                },
                times_viewed,
                votes_count: votes,
                positive_votes_count: votes,
                variants,
                ..Default::default()
            })
    }

    /// A consistent page: `page_index < total_pages`.
    pub fn arb_page_record() -> impl Strategy<Value = PageRecord> {
        (1usize..50)
            .prop_flat_map(|total_pages| {
                (
                    0..total_pages,
                    Just(total_pages),
                    arb_feature(),
                    prop::collection::vec(arb_image_record(), 0..5),
                )
            })
            .prop_map(|(page_index, total_pages, feature, items)| PageRecord {
                page_index,
                total_pages,
                total_items: (total_pages * 20) as u64,
                feature,
                items,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_page_is_consistent() {
        let page = fixtures::page("popular", 2, 5);
        assert_eq!(page.page_index, 2);
        assert_eq!(page.items.len(), fixtures::ITEMS_PER_PAGE);
        assert!(!page.is_placeholder());
    }

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::frozen();
        let start = clock.now();
        clock.advance_secs(30);
        clock.advance(Duration::from_secs(30));
        assert_eq!(clock.now() - start, TimeDelta::seconds(60));
    }

    #[test]
    fn test_fixture_errors_carry_requested_kind() {
        for kind in FeedErrorKind::ALL {
            assert_eq!(fixtures::error(kind).kind, kind);
        }
    }
}
