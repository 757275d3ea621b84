//! The pure state-transition core shared by every store.

use serde::{Serialize, de::DeserializeOwned};

/// A named, atomic state-transition request.
///
/// The label is what the devtools tap records for each commit
/// (e.g. `"toggleSidebar"`), so it must be stable across releases.
pub trait Action {
    /// Stable label identifying this action kind.
    fn label(&self) -> &'static str;
}

/// A store's state record together with its closed set of actions.
///
/// The implementing type itself is the state. It moves forward only
/// through [`reduce`](StoreState::reduce), and mirrors a fixed subset of
/// its fields to durable storage through [`Snapshot`](StoreState::Snapshot).
///
/// # Associated Types
///
/// - `Action`: the actions this store accepts.
/// - `Error`: action rejection error.
/// - `Snapshot`: the persistence projection. Lists exactly the fields that
///   survive a restart; everything else keeps its initial value.
///
/// # Contract
///
/// - [`reduce`](StoreState::reduce) must be pure: no I/O, no clocks, no
///   randomness. Anything non-deterministic (ids, timestamps) is generated
///   before the action is built.
/// - Returning `Err` must not be observable: the store discards the
///   partially computed state and keeps the previous record.
/// - `d.rehydrate(s.snapshot())` must agree with `s` on every persisted
///   field, whatever `d` is.
pub trait StoreState: Default + Clone + Send + Sync + 'static {
    /// Identifies this store (e.g. `"dashboard-store"`). Used as the
    /// storage key and as the devtools instance name.
    const STORE_NAME: &'static str;

    /// The set of actions this store accepts.
    type Action: Action + Send + 'static;

    /// Action rejection error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The statically typed persistence projection.
    type Snapshot: Serialize + DeserializeOwned + Send + 'static;

    /// Apply one action to produce the next state.
    fn reduce(self, action: Self::Action) -> Result<Self, Self::Error>;

    /// Project the persisted subset of fields out of the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Merge a previously persisted projection into an initial state.
    ///
    /// Fields outside the projection keep the values they have in `self`.
    fn rehydrate(self, snapshot: Self::Snapshot) -> Self;
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::{Counter, CounterAction, CounterError};
    use super::{Action, StoreState};

    #[test]
    fn reduce_increment() {
        let counter = Counter::default().reduce(CounterAction::Increment).unwrap();
        assert_eq!(counter.value, 1);
        assert_eq!(counter.touches, 1);
    }

    #[test]
    fn reduce_decrement_at_zero_is_rejected() {
        let result = Counter::default().reduce(CounterAction::Decrement);
        let err = result.unwrap_err();
        assert!(
            matches!(err, CounterError::AlreadyZero),
            "expected AlreadyZero, got: {err}"
        );
    }

    #[test]
    fn reduce_folds_in_order() {
        let state = [
            CounterAction::Add(5),
            CounterAction::Decrement,
            CounterAction::Increment,
        ]
        .into_iter()
        .try_fold(Counter::default(), |s, a| s.reduce(a))
        .unwrap();
        assert_eq!(state.value, 5);
        assert_eq!(state.touches, 3);
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(CounterAction::Increment.label(), "increment");
        assert_eq!(CounterAction::Add(2).label(), "add");
    }

    #[test]
    fn rehydrate_keeps_only_projected_fields() {
        let state = Counter {
            value: 9,
            touches: 4,
        };
        let restored = Counter::default().rehydrate(state.snapshot());
        assert_eq!(restored.value, 9);
        assert_eq!(restored.touches, 0);
    }
}
