//! Debug tap reporting every committed action with its label.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::state::StoreState;
use crate::store::Middleware;

/// Default number of records kept by a [`DevtoolsTap`].
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One committed action as seen by the tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    /// Name of the store the action was committed to.
    pub store: &'static str,
    /// The action's label (e.g. `"toggleSidebar"`).
    pub action: &'static str,
    /// When the commit was observed.
    pub at: DateTime<Utc>,
}

/// Observational middleware: emits a `tracing` event per commit and keeps a
/// bounded history of recent action labels.
///
/// Never affects state or control flow. One tap may be shared by several
/// stores; `Clone` is cheap and all clones share the same history.
#[derive(Debug, Clone)]
pub struct DevtoolsTap {
    history: Arc<Mutex<VecDeque<ActionRecord>>>,
    capacity: usize,
}

impl Default for DevtoolsTap {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl DevtoolsTap {
    /// Create a tap keeping at most `capacity` records. Zero keeps none
    /// and only emits tracing events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Recorded actions, oldest first.
    pub fn history(&self) -> Vec<ActionRecord> {
        self.lock().iter().cloned().collect()
    }

    /// Labels of the recorded actions, oldest first.
    pub fn labels(&self) -> Vec<&'static str> {
        self.lock().iter().map(|r| r.action).collect()
    }

    /// Forget all recorded actions.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ActionRecord>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, store: &'static str, action: &'static str) {
        if self.capacity == 0 {
            return;
        }
        let mut history = self.lock();
        while history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(ActionRecord {
            store,
            action,
            at: Utc::now(),
        });
    }
}

impl<S: StoreState> Middleware<S> for DevtoolsTap {
    fn on_init(&self, state: S) -> S {
        tracing::debug!(store = S::STORE_NAME, "devtools attached");
        state
    }

    fn on_commit(&self, label: &'static str, _state: &S) {
        tracing::debug!(store = S::STORE_NAME, action = label, "action committed");
        self.record(S::STORE_NAME, label);
    }
}
