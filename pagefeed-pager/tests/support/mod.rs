//! Shared controller harness for pager integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use pagefeed_pager::{ControllerOptions, MemorySink, PaginationController};
use pagefeed_test_utils::{ManualClock, MockFeedClient};
use tokio::runtime::Handle;

pub struct Harness {
    pub controller: PaginationController,
    pub client: Arc<MockFeedClient>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<MemorySink>,
}

/// Controller over a mock feed of `total_pages` pages. Must be called from
/// inside a tokio runtime.
pub fn harness(total_pages: usize) -> Harness {
    harness_with(total_pages, ControllerOptions::default())
}

pub fn harness_with(total_pages: usize, options: ControllerOptions) -> Harness {
    let client = MockFeedClient::new(total_pages);
    let clock = ManualClock::frozen();
    let sink = Arc::new(MemorySink::new());
    let controller = PaginationController::new(
        client.clone(),
        clock.clone(),
        sink.clone(),
        Handle::current(),
        options,
    );
    Harness {
        controller,
        client,
        clock,
        sink,
    }
}

/// A paused current-thread runtime for driving the controller from
/// synchronous proptest bodies.
pub fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("test runtime")
}
