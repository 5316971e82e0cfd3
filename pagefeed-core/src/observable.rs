//! Replay-latest observable cell.
//!
//! [`ObservableValue`] holds a current value and a list of observers. A new
//! observer is called once with the current value as it subscribes, then once
//! per [`ObservableValue::publish`]. Clones share the same cell, so handing a
//! clone to a consumer and publishing into the original later is how late
//! data reaches whoever is already watching.
//!
//! # Threading
//!
//! `publish` may be called from any thread. Publishes on one cell are
//! serialized: every observer sees values in the order the publishes acquired
//! the cell, and no observer sees a value twice or out of order. Observers run
//! on the publishing thread; use a foreground queue to move them elsewhere.
//!
//! Observers must not call `subscribe` or `publish` on the cell that is
//! currently delivering to them. Unsubscribing from inside an observer is fine.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Slot<T> {
    id: u64,
    active: Arc<AtomicBool>,
    observer: Observer<T>,
}

struct State<T> {
    value: T,
    slots: Vec<Slot<T>>,
    next_id: u64,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    /// Held for the whole of a replay or a publish so deliveries never
    /// interleave.
    delivery: Mutex<()>,
}

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// An observer that panics must not wedge every later publish.
fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<T: Send> Detach for Shared<T> {
    fn detach(&self, id: u64) {
        lock(&self.state).slots.retain(|slot| slot.id != id);
    }
}

/// A shared, thread-safe cell that pushes every new value to its observers.
pub struct ObservableValue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> ObservableValue<T>
where
    T: Clone + Send + 'static,
{
    /// Create a cell holding `initial` with no observers.
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    value: initial,
                    slots: Vec::new(),
                    next_id: 0,
                }),
                delivery: Mutex::new(()),
            }),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        lock(&self.shared.state).value.clone()
    }

    /// Register `observer`.
    ///
    /// The observer is invoked immediately with the current value, then with
    /// every later published value, until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let _delivery = lock(&self.shared.delivery);

        let observer: Observer<T> = Arc::new(observer);
        let active = Arc::new(AtomicBool::new(true));
        let (id, current) = {
            let mut state = lock(&self.shared.state);
            let id = state.next_id;
            state.next_id += 1;
            state.slots.push(Slot {
                id,
                active: Arc::clone(&active),
                observer: Arc::clone(&observer),
            });
            (id, state.value.clone())
        };

        observer(&current);

        let owner: Weak<dyn Detach> = Arc::downgrade(&self.shared) as Weak<dyn Detach>;
        Subscription { id, active, owner }
    }

    /// Store `value` as the current value and deliver it to every observer in
    /// subscription order.
    pub fn publish(&self, value: T) {
        let _delivery = lock(&self.shared.delivery);

        let (current, observers) = {
            let mut state = lock(&self.shared.state);
            state.value = value.clone();
            let observers: Vec<(Arc<AtomicBool>, Observer<T>)> = state
                .slots
                .iter()
                .map(|slot| (Arc::clone(&slot.active), Arc::clone(&slot.observer)))
                .collect();
            (value, observers)
        };

        for (active, observer) in observers {
            if active.load(Ordering::Acquire) {
                observer(&current);
            }
        }
    }

    /// Number of live observers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.state).slots.len()
    }

    /// True when both handles refer to the same cell.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.shared, &other.shared)
    }
}

impl<T> fmt::Debug for ObservableValue<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("ObservableValue")
            .field("value", &state.value)
            .field("subscribers", &state.slots.len())
            .finish()
    }
}

/// Handle returned by [`ObservableValue::subscribe`].
///
/// Unsubscribes on drop. [`Subscription::unsubscribe`] may be called any
/// number of times; once it returns no new delivery to the observer starts.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    owner: Weak<dyn Detach>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            if let Some(owner) = self.owner.upgrade() {
                owner.detach(self.id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl Fn(&i32) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &i32| sink.lock().unwrap().push(*value))
    }

    #[test]
    fn test_subscribe_replays_current_value() {
        let cell = ObservableValue::new(7);
        let (seen, observer) = recorder();
        let _sub = cell.subscribe(observer);
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn test_publish_reaches_observers_in_subscription_order() {
        let cell = ObservableValue::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&order);
        let _a = cell.subscribe(move |v: &i32| first.lock().unwrap().push(("a", *v)));
        let second = Arc::clone(&order);
        let _b = cell.subscribe(move |v: &i32| second.lock().unwrap().push(("b", *v)));

        order.lock().unwrap().clear();
        cell.publish(5);

        assert_eq!(*order.lock().unwrap(), vec![("a", 5), ("b", 5)]);
        assert_eq!(cell.get(), 5);
    }

    #[test]
    fn test_unsubscribe_stops_delivery_and_is_idempotent() {
        let cell = ObservableValue::new(1);
        let (seen, observer) = recorder();
        let sub = cell.subscribe(observer);

        cell.publish(2);
        sub.unsubscribe();
        sub.unsubscribe();
        cell.publish(3);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert!(!sub.is_active());
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let cell = ObservableValue::new(1);
        let (seen, observer) = recorder();
        {
            let _sub = cell.subscribe(observer);
            assert_eq!(cell.subscriber_count(), 1);
        }
        cell.publish(2);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn test_clones_share_one_cell() {
        let cell = ObservableValue::new("a".to_string());
        let handed_out = cell.clone();
        let (seen, observer) = {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&seen);
            (seen, move |v: &String| sink.lock().unwrap().push(v.clone()))
        };
        let _sub = handed_out.subscribe(observer);

        cell.publish("b".to_string());

        assert!(ObservableValue::ptr_eq(&cell, &handed_out));
        assert!(!ObservableValue::ptr_eq(&cell, &ObservableValue::new("b".to_string())));
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_unsubscribe_from_inside_observer() {
        let cell = ObservableValue::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let holder: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let counter = Arc::clone(&calls);
        let slot = Arc::clone(&holder);
        let sub = cell.subscribe(move |v: &i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            if *v == 1 {
                if let Some(sub) = slot.lock().unwrap().as_ref() {
                    sub.unsubscribe();
                }
            }
        });
        *holder.lock().unwrap() = Some(sub);

        cell.publish(1);
        cell.publish(2);

        // replay + the publish that unsubscribed
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscription_outliving_cell_is_harmless() {
        let cell = ObservableValue::new(0);
        let sub = cell.subscribe(|_| {});
        drop(cell);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }

    #[test]
    fn test_publish_from_many_threads_is_serialized() {
        let cell = ObservableValue::new(0usize);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = cell.subscribe(move |v: &usize| sink.lock().unwrap().push(*v));

        let handles: Vec<_> = (1..=8)
            .map(|n| {
                let cell = cell.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cell.publish(n * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        // replay + 8 * 50 publishes, each delivered exactly once
        assert_eq!(seen.len(), 1 + 8 * 50);
        // per-thread order is preserved
        for n in 1..=8usize {
            let mine: Vec<usize> = seen.iter().copied().filter(|v| v / 1000 == n).collect();
            let mut sorted = mine.clone();
            sorted.sort_unstable();
            assert_eq!(mine, sorted);
        }
        assert_eq!(Some(&cell.get()), seen.last());
    }
}
