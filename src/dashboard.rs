//! Dashboard store: sidebar visibility, colour theme and transient
//! notifications.
//!
//! Only `sidebar_open` and `theme` survive a restart; notifications are
//! session-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::state::{Action, StoreState};
use crate::storage::KeyValueStorage;
use crate::store::{Store, Subscription};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Colour theme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the operating system preference.
    #[default]
    System,
}

/// Severity of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient, user-facing message held by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique id, generated at creation.
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Creation time. Never changes.
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Create a notification with a fresh random id and the current time.
    pub fn new(draft: NotificationDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            message: draft.message,
            kind: draft.kind,
            timestamp: Utc::now(),
        }
    }
}

/// The caller-supplied part of a [`Notification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl NotificationDraft {
    /// A draft with the given content; id and timestamp are assigned on add.
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
        }
    }
}

/// State of the dashboard store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub sidebar_open: bool,
    pub theme: Theme,
    /// Display order is insertion order. Ids are unique.
    pub notifications: Vec<Notification>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            theme: Theme::System,
            notifications: Vec::new(),
        }
    }
}

/// The persisted projection of [`DashboardState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub sidebar_open: bool,
    pub theme: Theme,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Actions accepted by the dashboard store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardAction {
    ToggleSidebar,
    SetSidebarOpen(bool),
    SetTheme(Theme),
    /// Append a fully built notification. Ignored if its id is taken.
    AddNotification(Notification),
    RemoveNotification(String),
    ClearNotifications,
}

impl Action for DashboardAction {
    fn label(&self) -> &'static str {
        match self {
            Self::ToggleSidebar => "toggleSidebar",
            Self::SetSidebarOpen(_) => "setSidebarOpen",
            Self::SetTheme(_) => "setTheme",
            Self::AddNotification(_) => "addNotification",
            Self::RemoveNotification(_) => "removeNotification",
            Self::ClearNotifications => "clearNotifications",
        }
    }
}

impl StoreState for DashboardState {
    const STORE_NAME: &'static str = "dashboard-store";

    type Action = DashboardAction;
    type Error = DashboardError;
    type Snapshot = DashboardSnapshot;

    fn reduce(mut self, action: DashboardAction) -> Result<Self, DashboardError> {
        match action {
            DashboardAction::ToggleSidebar => self.sidebar_open = !self.sidebar_open,
            DashboardAction::SetSidebarOpen(open) => self.sidebar_open = open,
            DashboardAction::SetTheme(theme) => self.theme = theme,
            DashboardAction::AddNotification(notification) => {
                if !self.notifications.iter().any(|n| n.id == notification.id) {
                    self.notifications.push(notification);
                }
            }
            DashboardAction::RemoveNotification(id) => {
                self.notifications.retain(|n| n.id != id);
            }
            DashboardAction::ClearNotifications => self.notifications.clear(),
        }
        Ok(self)
    }

    fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            sidebar_open: self.sidebar_open,
            theme: self.theme,
        }
    }

    fn rehydrate(self, snapshot: DashboardSnapshot) -> Self {
        Self {
            sidebar_open: snapshot.sidebar_open,
            theme: snapshot.theme,
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// Handle to the dashboard store with one method per action.
///
/// `Clone` is cheap; clones share the same store.
///
/// # Examples
///
/// ```
/// use dashboard_stores::{DashboardStore, NotificationDraft, NotificationKind, Theme};
///
/// let store = DashboardStore::in_memory();
/// store.toggle_sidebar();
/// store.set_theme(Theme::Dark);
/// let id = store.add_notification(NotificationDraft::new("Saved", "Done", NotificationKind::Success));
/// store.remove_notification(&id);
/// store.set_sidebar_open(true);
/// store.clear_notifications();
///
/// let state = store.state();
/// assert!(state.sidebar_open);
/// assert_eq!(state.theme, Theme::Dark);
/// assert!(state.notifications.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct DashboardStore {
    store: Store<DashboardState>,
}

impl From<Store<DashboardState>> for DashboardStore {
    fn from(store: Store<DashboardState>) -> Self {
        Self { store }
    }
}

impl DashboardStore {
    /// A store without persistence or devtools.
    pub fn in_memory() -> Self {
        Store::<DashboardState>::builder().build().into()
    }

    /// A store persisted to `storage` under `"dashboard-store"`.
    pub fn persisted(storage: impl KeyValueStorage + 'static) -> Self {
        Store::<DashboardState>::builder()
            .persist(storage)
            .build()
            .into()
    }

    /// The underlying generic store.
    pub fn store(&self) -> &Store<DashboardState> {
        &self.store
    }

    /// Current state snapshot.
    pub fn state(&self) -> DashboardState {
        self.store.state()
    }

    /// Register a listener. See [`Store::subscribe`].
    pub fn subscribe<F>(&self, listener: F) -> Subscription<DashboardState>
    where
        F: Fn(&DashboardState) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    /// Flip the sidebar between open and closed.
    pub fn toggle_sidebar(&self) {
        self.commit(DashboardAction::ToggleSidebar);
    }

    /// Open or close the sidebar.
    pub fn set_sidebar_open(&self, open: bool) {
        self.commit(DashboardAction::SetSidebarOpen(open));
    }

    /// Switch the colour theme.
    pub fn set_theme(&self, theme: Theme) {
        self.commit(DashboardAction::SetTheme(theme));
    }

    /// Append a notification built from `draft` and return its new id.
    pub fn add_notification(&self, draft: NotificationDraft) -> String {
        let notification = Notification::new(draft);
        let id = notification.id.clone();
        self.commit(DashboardAction::AddNotification(notification));
        id
    }

    /// Remove the notification with `id`. Unknown ids are ignored.
    pub fn remove_notification(&self, id: &str) {
        self.commit(DashboardAction::RemoveNotification(id.to_owned()));
    }

    /// Remove every notification.
    pub fn clear_notifications(&self) {
        self.commit(DashboardAction::ClearNotifications);
    }

    fn commit(&self, action: DashboardAction) {
        match self.store.dispatch(action) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
