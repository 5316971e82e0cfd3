use pagefeed_cache::{EntryState, PageCache};
use pagefeed_core::{ObservableValue, PageRecord};
use pagefeed_test_utils::generators::arb_page_record;
use pagefeed_test_utils::ManualClock;
use proptest::prelude::*;

proptest! {
    // ========================================================================
    // Lazy expiry: nothing runs in the background, the read decides.
    // ========================================================================

    #[test]
    fn valid_strictly_inside_ttl(index in 0usize..64, elapsed in 0i64..300) {
        let clock = ManualClock::frozen();
        let mut cache = PageCache::new(clock.clone());
        let stream = ObservableValue::new(PageRecord::placeholder());
        cache.mark_refreshed(index, &stream);

        clock.advance_secs(elapsed);
        let hit = cache.try_get_valid(index);
        prop_assert!(hit.is_some());
        prop_assert!(ObservableValue::ptr_eq(&hit.unwrap(), &stream));
    }

    #[test]
    fn invalid_at_or_after_ttl(index in 0usize..64, overshoot in 0i64..100_000) {
        let clock = ManualClock::frozen();
        let mut cache = PageCache::new(clock.clone());
        cache.mark_refreshed(index, &ObservableValue::new(PageRecord::placeholder()));

        clock.advance_secs(300 + overshoot);
        prop_assert!(cache.try_get_valid(index).is_none());
        prop_assert_eq!(cache.state(index), Some(EntryState::Expired));
        prop_assert!(cache.get_even_if_invalid(index).is_some());
    }

    // ========================================================================
    // Stream identity across expiry/refresh cycles
    // ========================================================================

    #[test]
    fn stream_survives_refresh_cycles(cycles in 1usize..8, page in arb_page_record()) {
        let clock = ManualClock::frozen();
        let mut cache = PageCache::new(clock.clone());
        let original = ObservableValue::new(PageRecord::placeholder());
        cache.mark_refreshed(page.page_index, &original);

        for _ in 0..cycles {
            clock.advance_secs(301);
            prop_assert!(cache.try_get_valid(page.page_index).is_none());

            let stale = cache.get_even_if_invalid(page.page_index).unwrap();
            stale.publish(page.clone());
            cache.mark_refreshed(page.page_index, &stale);
        }

        let current = cache.try_get_valid(page.page_index).unwrap();
        prop_assert!(ObservableValue::ptr_eq(&current, &original));
        prop_assert_eq!(original.get(), page);
        prop_assert_eq!(cache.len(), 1);
    }
}
