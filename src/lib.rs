//! Client-side state stores for an admin dashboard.
//!
//! Two stores hold the UI state: [`DashboardStore`] (sidebar, theme,
//! notifications) and [`UserStore`] (signed-in user and session flags).
//! Both are thin facades over the generic [`Store`], which applies actions
//! through a pure [`StoreState::reduce`] core, notifies listeners, and runs
//! optional middleware: [`Persist`] mirrors the durable fields to a
//! [`KeyValueStorage`], and [`DevtoolsTap`] records every action.

mod app;
mod dashboard;
mod devtools;
mod error;
mod persist;
mod state;
mod storage;
mod store;
mod user;

pub mod config;
pub mod format;
pub mod metrics;
pub mod validation;

pub use app::AppStores;
pub use config::{ApiConfig, AppConfig};
pub use dashboard::{
    DashboardAction, DashboardSnapshot, DashboardState, DashboardStore, Notification,
    NotificationDraft, NotificationKind, Theme,
};
pub use devtools::{ActionRecord, DEFAULT_HISTORY_CAPACITY, DevtoolsTap};
pub use error::{DashboardError, FormatError, StorageError, UserError};
pub use persist::{
    DEFAULT_PERSIST_VERSION, Persist, PersistEnvelope, load_snapshot, save_snapshot,
};
pub use state::{Action, StoreState};
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use storage::LocalStorage;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{ListenerId, Middleware, Store, StoreBuilder, Subscription};
pub use user::{Role, User, UserAction, UserPatch, UserSnapshot, UserState, UserStore};
