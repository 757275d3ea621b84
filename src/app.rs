//! The application's pair of stores, wired to shared storage and devtools.

use std::sync::Arc;

use crate::dashboard::{DashboardState, DashboardStore};
use crate::devtools::DevtoolsTap;
use crate::storage::KeyValueStorage;
use crate::store::Store;
use crate::user::{UserState, UserStore};

/// Both application stores.
///
/// The stores share nothing but the storage backend and the devtools tap
/// they were opened with; each persists under its own key.
///
/// # Examples
///
/// ```
/// use dashboard_stores::{AppStores, MemoryStorage, Theme};
///
/// let stores = AppStores::open(MemoryStorage::new());
/// stores.dashboard.set_theme(Theme::Dark);
/// stores.user.set_loading(true);
///
/// assert_eq!(stores.devtools().labels(), vec!["setTheme", "setLoading"]);
/// ```
#[derive(Debug, Clone)]
pub struct AppStores {
    pub dashboard: DashboardStore,
    pub user: UserStore,
    devtools: DevtoolsTap,
}

impl AppStores {
    /// Open both stores against `storage`, rehydrating any persisted state,
    /// with a fresh devtools tap attached to each.
    pub fn open(storage: impl KeyValueStorage + 'static) -> Self {
        Self::open_with(Arc::new(storage), DevtoolsTap::default())
    }

    /// Like [`AppStores::open`] with an existing storage handle and tap.
    pub fn open_with(storage: Arc<dyn KeyValueStorage>, devtools: DevtoolsTap) -> Self {
        let dashboard = Store::<DashboardState>::builder()
            .persist(Arc::clone(&storage))
            .devtools(devtools.clone())
            .build();
        let user = Store::<UserState>::builder()
            .persist(storage)
            .devtools(devtools.clone())
            .build();

        Self {
            dashboard: dashboard.into(),
            user: user.into(),
            devtools,
        }
    }

    /// Both stores without persistence. The devtools tap is still attached.
    pub fn in_memory() -> Self {
        let devtools = DevtoolsTap::default();
        let dashboard = Store::<DashboardState>::builder()
            .devtools(devtools.clone())
            .build();
        let user = Store::<UserState>::builder()
            .devtools(devtools.clone())
            .build();

        Self {
            dashboard: dashboard.into(),
            user: user.into(),
            devtools,
        }
    }

    /// The tap shared by both stores.
    pub fn devtools(&self) -> &DevtoolsTap {
        &self.devtools
    }
}
