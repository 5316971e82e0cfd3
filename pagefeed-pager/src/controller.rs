//! Pagination and prefetch over a [`PageCache`].
//!
//! `request_page` never waits on the network. It hands back the stream for
//! the page right away, seeded with the last known record (or a placeholder),
//! and a background task publishes into that stream when the fetch lands.
//!
//! Failed fetches are dropped: nothing is published, the cache is untouched
//! and a [`Diagnostic::FetchAbandoned`] goes to the sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pagefeed_cache::{CacheStats, Clock, PageCache};
use pagefeed_client::{FeedClient, FeedConfig, FeedRequest, DEFAULT_FEATURE};
use pagefeed_core::{FeedResult, ObservableValue, PageRecord};
use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::diagnostics::{Diagnostic, DiagnosticSink, SkipReason};

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Items per page requested from the feed.
    pub page_size: u32,
    /// Return the existing stream instead of starting a second fetch for a
    /// page that already has one in flight.
    pub dedupe_in_flight: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            dedupe_in_flight: false,
        }
    }
}

impl From<&FeedConfig> for ControllerOptions {
    fn from(config: &FeedConfig) -> Self {
        Self {
            page_size: config.page_size,
            dedupe_in_flight: config.dedupe_in_flight,
        }
    }
}

struct State {
    feature: String,
    /// Bumped whenever the feature changes; fetches from an older
    /// generation are discarded on completion.
    generation: u64,
    cache: PageCache,
    /// Streams handed out for pages that have not been refreshed yet.
    unrefreshed: HashMap<usize, ObservableValue<PageRecord>>,
    /// Fetches in flight, per generation and page index.
    in_flight: HashMap<(u64, usize), usize>,
    /// Authoritative page count. `Inner::page_count` mirrors it.
    page_count: usize,
    /// Bumped on every change to `page_count`.
    count_version: u64,
}

impl State {
    fn in_flight_total(&self) -> usize {
        self.in_flight.values().sum()
    }
}

struct Inner {
    client: Arc<dyn FeedClient>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn DiagnosticSink>,
    runtime: Handle,
    options: ControllerOptions,
    state: Mutex<State>,
    page_count: ObservableValue<usize>,
    idle: Notify,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the page count held in `State` until the published value is
    /// still the current one.
    ///
    /// Publishing happens without the state lock so observers may call back
    /// into the controller. A racing update makes the loser publish again.
    fn sync_page_count(&self) {
        loop {
            let (version, count) = {
                let state = self.lock_state();
                (state.count_version, state.page_count)
            };
            self.page_count.publish(count);
            if self.lock_state().count_version == version {
                return;
            }
        }
    }

    fn complete(
        &self,
        fetch: &Fetch,
        stream: &ObservableValue<PageRecord>,
        outcome: FeedResult<PageRecord>,
    ) {
        let count_changed = {
            let mut state = self.lock_state();
            if state.generation != fetch.generation {
                tracing::debug!(
                    feature = %fetch.feature,
                    page_index = fetch.index,
                    "Discarding page fetched for a previous feature"
                );
                return;
            }
            match &outcome {
                Ok(record) if record.total_pages != state.page_count => {
                    state.page_count = record.total_pages;
                    state.count_version += 1;
                    true
                }
                _ => false,
            }
        };

        match outcome {
            Ok(record) => {
                if count_changed {
                    tracing::info!(
                        feature = %fetch.feature,
                        total_pages = record.total_pages,
                        "Page count changed"
                    );
                    self.sync_page_count();
                }

                stream.publish(record);

                let mut state = self.lock_state();
                if state.generation == fetch.generation {
                    state.cache.mark_refreshed(fetch.index, stream);
                    state.unrefreshed.remove(&fetch.index);
                }
                tracing::debug!(feature = %fetch.feature, page_index = fetch.index, "Page refreshed");
            }
            Err(error) => {
                self.sink.record(Diagnostic::FetchAbandoned {
                    feature: fetch.feature.clone(),
                    page_index: fetch.index,
                    error,
                });
            }
        }
    }
}

/// Identifies one spawned fetch.
struct Fetch {
    feature: String,
    index: usize,
    generation: u64,
}

/// Keeps the in-flight count honest even if the fetch task is dropped
/// before it runs or panics midway.
struct InFlightGuard {
    inner: Arc<Inner>,
    key: (u64, usize),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let idle = {
            let mut state = self.inner.lock_state();
            if let Some(count) = state.in_flight.get_mut(&self.key) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    state.in_flight.remove(&self.key);
                }
            }
            state.in_flight.is_empty()
        };
        if idle {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Drives page fetches for one feed and caches their streams.
///
/// Cheap to clone; clones share the cache and counters.
#[derive(Clone)]
pub struct PaginationController {
    inner: Arc<Inner>,
}

impl PaginationController {
    /// A controller for [`DEFAULT_FEATURE`] with an empty cache. Nothing is
    /// fetched until a page is requested.
    ///
    /// Fetches are spawned on `runtime`.
    pub fn new(
        client: Arc<dyn FeedClient>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn DiagnosticSink>,
        runtime: Handle,
        options: ControllerOptions,
    ) -> Self {
        let state = State {
            feature: DEFAULT_FEATURE.to_string(),
            generation: 0,
            cache: PageCache::new(Arc::clone(&clock)),
            unrefreshed: HashMap::new(),
            in_flight: HashMap::new(),
            page_count: 1,
            count_version: 0,
        };

        Self {
            inner: Arc::new(Inner {
                client,
                clock,
                sink,
                runtime,
                options,
                state: Mutex::new(state),
                page_count: ObservableValue::new(1),
                idle: Notify::new(),
            }),
        }
    }

    /// Select `feature` and fetch its first page.
    ///
    /// Switching to a different feature starts over: the cache is emptied,
    /// the page count drops back to 1 and fetches still in flight for the old
    /// feature are discarded when they land.
    pub fn initialize(&self, feature: &str) -> ObservableValue<PageRecord> {
        let reset = {
            let mut state = self.inner.lock_state();
            if state.feature == feature {
                false
            } else {
                state.feature = feature.to_string();
                state.generation += 1;
                state.cache = PageCache::new(Arc::clone(&self.inner.clock));
                state.unrefreshed.clear();
                state.page_count = 1;
                state.count_version += 1;
                true
            }
        };

        if reset {
            tracing::info!(feature, "Feature selected");
            self.inner.sync_page_count();
        }
        self.request_page(0)
    }

    /// The stream for zero-based page `index`.
    ///
    /// A valid cache entry is returned as is. Otherwise a fetch is started
    /// and the stream the page already has (or a fresh placeholder stream) is
    /// returned before it completes.
    pub fn request_page(&self, index: usize) -> ObservableValue<PageRecord> {
        let mut state = self.inner.lock_state();

        if let Some(stream) = state.cache.try_get_valid(index) {
            tracing::debug!(feature = %state.feature, page_index = index, "Page cache hit");
            return stream;
        }

        let stream = match state.cache.get_even_if_invalid(index) {
            Some(stream) => stream,
            None => state
                .unrefreshed
                .entry(index)
                .or_insert_with(|| ObservableValue::new(PageRecord::placeholder()))
                .clone(),
        };

        let feature = state.feature.clone();
        let key = (state.generation, index);
        if self.inner.options.dedupe_in_flight && state.in_flight.contains_key(&key) {
            drop(state);
            self.inner.sink.record(Diagnostic::FetchSkipped {
                feature,
                page_index: index,
                reason: SkipReason::AlreadyInFlight,
            });
            return stream;
        }

        *state.in_flight.entry(key).or_insert(0) += 1;
        let fetch = Fetch {
            feature,
            index,
            generation: state.generation,
        };
        drop(state);

        self.spawn_fetch(fetch, stream.clone());
        stream
    }

    /// Page 0, prefetching page 1 alongside it.
    pub fn first_page(&self) -> ObservableValue<PageRecord> {
        let first = self.request_page(0);
        let _ = self.request_page(1);
        first
    }

    /// The page before `current`, or `None` on the first page.
    ///
    /// Also prefetches `current - 2` when it exists.
    pub fn page_before(&self, current: usize) -> Option<ObservableValue<PageRecord>> {
        if current == 0 {
            return None;
        }
        if current - 1 > 0 {
            let _ = self.request_page(current - 2);
        }
        Some(self.request_page(current - 1))
    }

    /// The page after `current`, or `None` on the last known page.
    ///
    /// Also prefetches `current + 2` when it exists.
    pub fn page_after(&self, current: usize) -> Option<ObservableValue<PageRecord>> {
        let page_count = self.page_count();
        if current + 1 >= page_count {
            return None;
        }
        if current + 2 < page_count {
            let _ = self.request_page(current + 2);
        }
        Some(self.request_page(current + 1))
    }

    /// Drop the cached validity of `index` and fetch it again.
    pub fn refresh(&self, index: usize) -> ObservableValue<PageRecord> {
        self.inner.lock_state().cache.invalidate(index);
        self.request_page(index)
    }

    /// Total pages as last reported by the feed for the current feature; 1
    /// until then.
    pub fn page_count(&self) -> usize {
        self.inner.lock_state().page_count
    }

    /// Publishes the new page count whenever a fetch reports a different one.
    ///
    /// Paging UIs should re-check their first/last page decisions on every
    /// notification.
    pub fn page_count_stream(&self) -> ObservableValue<usize> {
        self.inner.page_count.clone()
    }

    pub fn feature(&self) -> String {
        self.inner.lock_state().feature.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.lock_state().cache.stats()
    }

    /// Fetches started and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.lock_state().in_flight_total()
    }

    /// Resolves once no fetch is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn spawn_fetch(&self, fetch: Fetch, stream: ObservableValue<PageRecord>) {
        let request = FeedRequest::for_index(&fetch.feature, fetch.index, self.inner.options.page_size);
        tracing::debug!(
            feature = %fetch.feature,
            page_index = fetch.index,
            page = request.page,
            "Fetching page"
        );

        let inner = Arc::clone(&self.inner);
        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
            key: (fetch.generation, fetch.index),
        };
        self.inner.runtime.spawn(async move {
            let _guard = guard;
            let outcome = inner.client.fetch_page(&request).await;
            inner.complete(&fetch, &stream, outcome);
        });
    }
}

impl std::fmt::Debug for PaginationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("PaginationController")
            .field("feature", &state.feature)
            .field("page_count", &state.page_count)
            .field("cached_pages", &state.cache.len())
            .field("in_flight", &state.in_flight_total())
            .field("options", &self.inner.options)
            .finish()
    }
}
