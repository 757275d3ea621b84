//! Generic store container: state ownership, atomic commits, middleware
//! decoration and listener notification.
//!
//! A [`Store`] is opened via [`StoreBuilder`], which composes the optional
//! persistence and devtools middleware around the pure
//! [`StoreState::reduce`] core and rehydrates the initial state.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;

use crate::devtools::DevtoolsTap;
use crate::persist::Persist;
use crate::state::{Action, StoreState};
use crate::storage::KeyValueStorage;

/// A decoration run around every commit of a store.
///
/// Middleware observe committed state; they cannot veto or alter an
/// action. They run in registration order while the store's commit lock is
/// held, so they see commits in the exact order they happened and must not
/// call back into the store.
pub trait Middleware<S: StoreState>: Send + Sync {
    /// Adjust the initial state when the store is built.
    ///
    /// Called once, in registration order, each middleware receiving the
    /// previous one's output. The default keeps the state as is.
    fn on_init(&self, state: S) -> S {
        state
    }

    /// Observe a committed state, labelled with the action that produced it.
    fn on_commit(&self, label: &'static str, state: &S);
}

/// Identifies a registered listener within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// Committed states waiting for listener delivery, in commit order.
struct Delivery<S> {
    queue: VecDeque<S>,
    /// Set while some thread is draining `queue`.
    draining: bool,
}

struct Inner<S: StoreState> {
    state: Mutex<S>,
    delivery: Mutex<Delivery<S>>,
    listeners: Mutex<Vec<(ListenerId, Listener<S>)>>,
    next_listener: AtomicU64,
    middleware: Vec<Box<dyn Middleware<S>>>,
    watch_tx: watch::Sender<S>,
}

impl<S: StoreState> Inner<S> {
    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    fn delivery(&self) -> std::sync::MutexGuard<'_, Delivery<S>> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_subscribed(&self, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(lid, _)| *lid == id)
    }
}

/// An in-memory state container with a closed set of actions.
///
/// `Clone` is cheap: all clones share the same state, listeners and
/// middleware. Construct once at startup and hand clones to consumers.
pub struct Store<S: StoreState> {
    inner: Arc<Inner<S>>,
}

impl<S: StoreState> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

// Manual `Debug`: listeners and middleware are trait objects.
impl<S: StoreState + std::fmt::Debug> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &S::STORE_NAME)
            .field("state", &self.state())
            .finish()
    }
}

impl<S: StoreState> Store<S> {
    /// Start building a store with default initial state and no middleware.
    pub fn builder() -> StoreBuilder<S> {
        StoreBuilder::new()
    }

    /// The store's name, which is also its storage key.
    pub fn name(&self) -> &'static str {
        S::STORE_NAME
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> S {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply an action.
    ///
    /// Computes the next state from the current one via
    /// [`StoreState::reduce`] and replaces it in a single step. Middleware
    /// then observe the commit, and finally every listener is invoked with
    /// the new state, synchronously and in subscription order.
    ///
    /// Listeners receive states in commit order, one state at a time. When a
    /// listener dispatches re-entrantly, or another thread is already
    /// delivering, the new state is queued and delivered by that caller once
    /// the current round finishes; this call may then return before its own
    /// state reaches the listeners.
    ///
    /// # Errors
    ///
    /// Returns the store's action error if the action is rejected. The
    /// previous state is kept and no middleware or listener runs.
    pub fn dispatch(&self, action: S::Action) -> Result<(), S::Error> {
        let label = action.label();
        {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let next = state.clone().reduce(action)?;
            *state = next.clone();

            for middleware in &self.inner.middleware {
                middleware.on_commit(label, &next);
            }
            self.inner.watch_tx.send_replace(next.clone());
            // Enqueued before the state lock drops so queue order is commit order.
            self.inner.delivery().queue.push_back(next);
        }

        self.drain();
        Ok(())
    }

    /// Register a listener invoked with the new state after every commit.
    ///
    /// The same closure may be registered more than once; each
    /// registration is called separately. Dropping the returned
    /// [`Subscription`] does **not** unsubscribe -- call
    /// [`Subscription::unsubscribe`] or [`Store::unsubscribe`].
    pub fn subscribe<F>(&self, listener: F) -> Subscription<S>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a listener by id.
    ///
    /// Returns `false` if it was already removed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.remove_listener(id)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Latest-value channel for consumers that must not run on the
    /// dispatching thread.
    ///
    /// The receiver starts marked as seen at the current state and wakes on
    /// every later commit. Intermediate states may be skipped by a slow
    /// consumer.
    pub fn watch(&self) -> watch::Receiver<S> {
        self.inner.watch_tx.subscribe()
    }

    /// Deliver queued states until the queue is empty, unless another call
    /// is already doing so.
    fn drain(&self) {
        {
            let mut delivery = self.inner.delivery();
            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }
        let mut guard = DrainGuard {
            inner: &self.inner,
            armed: true,
        };

        loop {
            let next = {
                let mut delivery = self.inner.delivery();
                match delivery.queue.pop_front() {
                    Some(next) => next,
                    None => {
                        delivery.draining = false;
                        guard.armed = false;
                        return;
                    }
                }
            };
            self.notify(&next);
        }
    }

    fn notify(&self, state: &S) {
        // Snapshot the list so listeners can subscribe or unsubscribe (or
        // dispatch) without holding the lock.
        let listeners: Vec<(ListenerId, Listener<S>)> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, listener) in listeners {
            // Skip listeners removed earlier in this same round.
            if self.inner.is_subscribed(id) {
                listener(state);
            }
        }
    }
}

/// Releases the draining flag if a listener panics mid-delivery.
struct DrainGuard<'a, S: StoreState> {
    inner: &'a Inner<S>,
    armed: bool,
}

impl<S: StoreState> Drop for DrainGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.delivery().draining = false;
        }
    }
}

/// Handle to a registered listener.
pub struct Subscription<S: StoreState> {
    id: ListenerId,
    inner: Weak<Inner<S>>,
}

impl<S: StoreState> Subscription<S> {
    /// The listener's id within its store.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener.
    ///
    /// Idempotent. Returns `false` if the listener was already removed or
    /// the store no longer exists.
    pub fn unsubscribe(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.remove_listener(self.id))
    }
}

impl<S: StoreState> std::fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("store", &S::STORE_NAME)
            .field("id", &self.id)
            .finish()
    }
}

/// Builder for [`Store`].
///
/// # Examples
///
/// ```
/// use dashboard_stores::{DashboardState, DevtoolsTap, MemoryStorage, Store};
///
/// let tap = DevtoolsTap::default();
/// let store = Store::<DashboardState>::builder()
///     .persist(MemoryStorage::new())
///     .devtools(tap.clone())
///     .build();
/// assert_eq!(store.name(), "dashboard-store");
/// ```
pub struct StoreBuilder<S: StoreState> {
    initial: S,
    middleware: Vec<Box<dyn Middleware<S>>>,
}

impl<S: StoreState> Default for StoreBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StoreState> StoreBuilder<S> {
    /// Create a builder with `S::default()` as the initial state.
    pub fn new() -> Self {
        Self {
            initial: S::default(),
            middleware: Vec::new(),
        }
    }

    /// Replace the hard-coded initial state.
    ///
    /// Persisted fields are still merged over it at build time.
    pub fn initial(mut self, state: S) -> Self {
        self.initial = state;
        self
    }

    /// Mirror the store's snapshot to `storage` under [`StoreState::STORE_NAME`].
    pub fn persist(self, storage: impl KeyValueStorage + 'static) -> Self {
        self.middleware(Persist::<S>::new(storage))
    }

    /// Report every commit to a devtools tap.
    pub fn devtools(self, tap: DevtoolsTap) -> Self {
        self.middleware(tap)
    }

    /// Register an arbitrary middleware. Middleware run in registration order.
    pub fn middleware(mut self, middleware: impl Middleware<S> + 'static) -> Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    /// Build the store, letting each middleware adjust the initial state.
    pub fn build(self) -> Store<S> {
        let state = self
            .middleware
            .iter()
            .fold(self.initial, |state, m| m.on_init(state));

        tracing::info!(
            store = S::STORE_NAME,
            middleware = self.middleware.len(),
            "store built"
        );

        let (watch_tx, _) = watch::channel(state.clone());
        Store {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                delivery: Mutex::new(Delivery {
                    queue: VecDeque::new(),
                    draining: false,
                }),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                middleware: self.middleware,
                watch_tx,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_fixtures::{Counter, CounterAction, CounterError};
    use std::sync::Mutex;

    fn counter_store() -> Store<Counter> {
        Store::<Counter>::builder().build()
    }

    /// Records every `(label, value)` pair it observes.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(&'static str, u64)>>>);

    impl Middleware<Counter> for Recorder {
        fn on_commit(&self, label: &'static str, state: &Counter) {
            self.0.lock().unwrap().push((label, state.value));
        }
    }

    /// Starts every store at 100.
    struct StartAtHundred;

    impl Middleware<Counter> for StartAtHundred {
        fn on_init(&self, mut state: Counter) -> Counter {
            state.value = 100;
            state
        }

        fn on_commit(&self, _label: &'static str, _state: &Counter) {}
    }

    #[test]
    fn dispatch_commits_new_state() {
        let store = counter_store();
        store.dispatch(CounterAction::Increment).unwrap();
        store.dispatch(CounterAction::Add(4)).unwrap();
        assert_eq!(store.state().value, 5);
    }

    #[test]
    fn rejected_action_leaves_state_and_skips_everyone() {
        let recorder = Recorder::default();
        let store = Store::<Counter>::builder()
            .middleware(recorder.clone())
            .build();
        let calls = Arc::new(Mutex::new(0));
        let calls_in = Arc::clone(&calls);
        store.subscribe(move |_| *calls_in.lock().unwrap() += 1);

        let err = store.dispatch(CounterAction::Decrement).unwrap_err();
        assert!(matches!(err, CounterError::AlreadyZero));
        assert_eq!(store.state(), Counter::default());
        assert!(recorder.0.lock().unwrap().is_empty());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn listeners_called_in_subscription_order() {
        let store = counter_store();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            store.subscribe(move |s: &Counter| log.lock().unwrap().push((tag, s.value)));
        }

        store.dispatch(CounterAction::Increment).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![("first", 1), ("second", 1), ("third", 1)]
        );
    }

    #[test]
    fn same_closure_registered_twice_runs_twice() {
        let store = counter_store();
        let calls = Arc::new(Mutex::new(0));
        let listener = {
            let calls = Arc::clone(&calls);
            move |_: &Counter| *calls.lock().unwrap() += 1
        };
        store.subscribe(listener.clone());
        store.subscribe(listener);

        store.dispatch(CounterAction::Increment).unwrap();
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery_and_is_idempotent() {
        let store = counter_store();
        let calls = Arc::new(Mutex::new(0));
        let calls_in = Arc::clone(&calls);
        let sub = store.subscribe(move |_| *calls_in.lock().unwrap() += 1);

        store.dispatch(CounterAction::Increment).unwrap();
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        store.dispatch(CounterAction::Increment).unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn unsubscribing_during_notification_keeps_others_running() {
        let store = counter_store();
        let log = Arc::new(Mutex::new(Vec::new()));

        // The first listener removes itself and the second one.
        let second_id = Arc::new(Mutex::new(None::<ListenerId>));
        let first = {
            let store = store.clone();
            let log = Arc::clone(&log);
            let second_id = Arc::clone(&second_id);
            let own_id = Arc::new(Mutex::new(None::<ListenerId>));
            let own_id_in = Arc::clone(&own_id);
            let sub = store.clone().subscribe(move |_| {
                log.lock().unwrap().push("first");
                if let Some(id) = *own_id_in.lock().unwrap() {
                    store.unsubscribe(id);
                }
                if let Some(id) = *second_id.lock().unwrap() {
                    store.unsubscribe(id);
                }
            });
            *own_id.lock().unwrap() = Some(sub.id());
            sub
        };
        let second = {
            let log = Arc::clone(&log);
            store.subscribe(move |_| log.lock().unwrap().push("second"))
        };
        *second_id.lock().unwrap() = Some(second.id());
        {
            let log = Arc::clone(&log);
            store.subscribe(move |_| log.lock().unwrap().push("third"));
        }

        store.dispatch(CounterAction::Increment).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "third"]);

        store.dispatch(CounterAction::Increment).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "third", "third"]);
        assert!(!first.unsubscribe());
    }

    #[test]
    fn listener_may_read_state_and_dispatch_reentrantly() {
        let store = counter_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let store_in = store.clone();
            let seen = Arc::clone(&seen);
            store.subscribe(move |s: &Counter| {
                seen.lock().unwrap().push(store_in.state().value);
                if s.value == 1 {
                    store_in.dispatch(CounterAction::Add(10)).unwrap();
                }
            });
        }

        store.dispatch(CounterAction::Increment).unwrap();
        assert_eq!(store.state().value, 11);
        assert_eq!(*seen.lock().unwrap(), vec![1, 11]);
    }

    #[test]
    fn reentrant_dispatch_reaches_every_listener_in_commit_order() {
        let store = counter_store();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        {
            let store_in = store.clone();
            let first = Arc::clone(&first);
            store.subscribe(move |s: &Counter| {
                first.lock().unwrap().push(s.value);
                if s.value == 1 {
                    store_in.dispatch(CounterAction::Add(10)).unwrap();
                }
            });
        }
        {
            let second = Arc::clone(&second);
            store.subscribe(move |s: &Counter| second.lock().unwrap().push(s.value));
        }

        store.dispatch(CounterAction::Increment).unwrap();
        assert_eq!(*first.lock().unwrap(), vec![1, 11]);
        assert_eq!(*second.lock().unwrap(), vec![1, 11]);
    }

    #[test]
    fn concurrent_dispatchers_deliver_in_commit_order() {
        const THREADS: u64 = 4;
        const PER_THREAD: u64 = 250;

        let store = counter_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            store.subscribe(move |s: &Counter| seen.lock().unwrap().push(s.value));
        }

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..PER_THREAD {
                        store.dispatch(CounterAction::Increment).unwrap();
                    }
                });
            }
        });

        let expected: Vec<u64> = (1..=THREADS * PER_THREAD).collect();
        assert_eq!(*seen.lock().unwrap(), expected);
    }

    #[test]
    fn panicking_listener_does_not_stall_later_deliveries() {
        let store = counter_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            store.subscribe(move |s: &Counter| {
                seen.lock().unwrap().push(s.value);
                assert_ne!(s.value, 1, "listener failure");
            });
        }

        let store_in = store.clone();
        let result = std::thread::spawn(move || store_in.dispatch(CounterAction::Increment)).join();
        assert!(result.is_err());

        store.dispatch(CounterAction::Increment).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn middleware_observe_labels_in_commit_order() {
        let recorder = Recorder::default();
        let store = Store::<Counter>::builder()
            .middleware(recorder.clone())
            .build();

        store.dispatch(CounterAction::Add(2)).unwrap();
        store.dispatch(CounterAction::Decrement).unwrap();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![("add", 2), ("decrement", 1)]
        );
    }

    #[test]
    fn on_init_runs_over_explicit_initial_state() {
        let store = Store::<Counter>::builder()
            .initial(Counter {
                value: 1,
                touches: 7,
            })
            .middleware(StartAtHundred)
            .build();
        let state = store.state();
        assert_eq!(state.value, 100);
        assert_eq!(state.touches, 7);
    }

    #[test]
    fn subscription_outliving_store_reports_false() {
        let store = counter_store();
        let sub = store.subscribe(|_| {});
        drop(store);
        assert!(!sub.unsubscribe());
    }

    #[tokio::test]
    async fn watch_receives_latest_commit() {
        let store = counter_store();
        let mut rx = store.watch();
        assert_eq!(rx.borrow().value, 0);

        let writer = store.clone();
        let task = tokio::spawn(async move {
            writer.dispatch(CounterAction::Add(3)).unwrap();
        });

        rx.changed().await.expect("store dropped");
        assert_eq!(rx.borrow_and_update().value, 3);
        task.await.unwrap();
    }

    #[test]
    fn clones_share_state() {
        let a = counter_store();
        let b = a.clone();
        a.dispatch(CounterAction::Increment).unwrap();
        assert_eq!(b.state().value, 1);
        assert_eq!(b.name(), "counter-store");
    }
}
