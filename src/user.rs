//! User session store: the signed-in user, the authentication flag and a
//! transient loading flag.
//!
//! `user` and `is_authenticated` survive a restart; `is_loading` always
//! starts `false`.

use serde::{Deserialize, Serialize};

use crate::error::UserError;
use crate::state::{Action, StoreState};
use crate::storage::KeyValueStorage;
use crate::store::{Store, Subscription};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Authorisation role of a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Moderator,
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: Role,
}

impl User {
    /// A user without an avatar.
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            avatar: None,
            role,
        }
    }

    /// Builder method to set the avatar URL.
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Check that every required field is filled in.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::InvalidState`] naming the first blank field
    /// among `id`, `email` and `name`.
    pub fn validate(&self) -> Result<(), UserError> {
        for (field, value) in [("id", &self.id), ("email", &self.email), ("name", &self.name)] {
            if value.trim().is_empty() {
                return Err(UserError::InvalidState(format!("user.{field} is required")));
            }
        }
        Ok(())
    }

    /// Parse a user from JSON, rejecting records with missing or blank
    /// required fields.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::InvalidState`] if the JSON does not describe a
    /// complete user.
    pub fn from_json(json: &str) -> Result<Self, UserError> {
        let user: Self =
            serde_json::from_str(json).map_err(|e| UserError::InvalidState(e.to_string()))?;
        user.validate()?;
        Ok(user)
    }
}

/// A partial [`User`]: every `Some` field replaces the current value.
///
/// `avatar` is doubly optional so a patch can clear it
/// (`Some(None)`) as well as leave it alone (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<Option<String>>,
    pub role: Option<Role>,
}

impl UserPatch {
    /// Replace the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the email address.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Replace the avatar; `None` clears it.
    pub fn avatar(mut self, avatar: Option<String>) -> Self {
        self.avatar = Some(avatar);
        self
    }

    /// Replace the role.
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Apply the patch field by field.
    pub fn merge_into(self, mut user: User) -> User {
        if let Some(id) = self.id {
            user.id = id;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(avatar) = self.avatar {
            user.avatar = avatar;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        user
    }
}

/// State of the user store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    pub user: Option<User>,
    /// Only ever `true` while `user` is `Some`.
    pub is_authenticated: bool,
    pub is_loading: bool,
}

/// The persisted projection of [`UserState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Actions accepted by the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Sign a user in. Rejected if the user is incomplete.
    SetUser(User),
    ClearUser,
    SetLoading(bool),
    /// Merge into the current user; no-op when signed out. Rejected if the
    /// merged user is incomplete.
    UpdateUser(UserPatch),
}

impl Action for UserAction {
    fn label(&self) -> &'static str {
        match self {
            Self::SetUser(_) => "setUser",
            Self::ClearUser => "clearUser",
            Self::SetLoading(_) => "setLoading",
            Self::UpdateUser(_) => "updateUser",
        }
    }
}

impl StoreState for UserState {
    const STORE_NAME: &'static str = "user-store";

    type Action = UserAction;
    type Error = UserError;
    type Snapshot = UserSnapshot;

    fn reduce(mut self, action: UserAction) -> Result<Self, UserError> {
        match action {
            UserAction::SetUser(user) => {
                user.validate()?;
                self.user = Some(user);
                self.is_authenticated = true;
                self.is_loading = false;
            }
            UserAction::ClearUser => {
                self.user = None;
                self.is_authenticated = false;
                self.is_loading = false;
            }
            UserAction::SetLoading(loading) => self.is_loading = loading,
            UserAction::UpdateUser(patch) => {
                if let Some(user) = self.user.take() {
                    let merged = patch.merge_into(user);
                    merged.validate()?;
                    self.user = Some(merged);
                }
            }
        }
        Ok(self)
    }

    fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            user: self.user.clone(),
            is_authenticated: self.is_authenticated,
        }
    }

    fn rehydrate(self, snapshot: UserSnapshot) -> Self {
        // A blob claiming a session without a user is treated as signed out.
        let is_authenticated = snapshot.is_authenticated && snapshot.user.is_some();
        Self {
            user: snapshot.user,
            is_authenticated,
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// Handle to the user store with one method per action.
///
/// `Clone` is cheap; clones share the same store.
///
/// # Examples
///
/// ```
/// use dashboard_stores::{Role, User, UserPatch, UserStore};
///
/// let store = UserStore::in_memory();
/// store.set_loading(true);
/// store.set_user(User::new("u-1", "alice@example.com", "Alice", Role::User))?;
/// store.update_user(UserPatch::default().name("Alicia").role(Role::Admin))?;
/// assert_eq!(store.state().user.map(|u| u.name).as_deref(), Some("Alicia"));
///
/// store.clear_user();
/// assert!(!store.state().is_authenticated);
/// # Ok::<(), dashboard_stores::UserError>(())
/// ```
#[derive(Debug, Clone)]
pub struct UserStore {
    store: Store<UserState>,
}

impl From<Store<UserState>> for UserStore {
    fn from(store: Store<UserState>) -> Self {
        Self { store }
    }
}

impl UserStore {
    /// A store without persistence or devtools.
    pub fn in_memory() -> Self {
        Store::<UserState>::builder().build().into()
    }

    /// A store persisted to `storage` under `"user-store"`.
    pub fn persisted(storage: impl KeyValueStorage + 'static) -> Self {
        Store::<UserState>::builder()
            .persist(storage)
            .build()
            .into()
    }

    /// The underlying generic store.
    pub fn store(&self) -> &Store<UserState> {
        &self.store
    }

    /// Current state snapshot.
    pub fn state(&self) -> UserState {
        self.store.state()
    }

    /// Register a listener. See [`Store::subscribe`].
    pub fn subscribe<F>(&self, listener: F) -> Subscription<UserState>
    where
        F: Fn(&UserState) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    /// Sign `user` in.
    ///
    /// The store keeps `id`, `email` and `name` non-blank for as long as a
    /// user is signed in; [`update_user`](Self::update_user) enforces the
    /// same rule on the merged record.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::InvalidState`] if a required field is blank.
    /// The state is left untouched and no listener runs.
    pub fn set_user(&self, user: User) -> Result<(), UserError> {
        self.store.dispatch(UserAction::SetUser(user))
    }

    /// Sign in a user received as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::InvalidState`] if the JSON is not a complete user.
    pub fn set_user_json(&self, json: &str) -> Result<(), UserError> {
        self.set_user(User::from_json(json)?)
    }

    /// Sign out and reset both flags.
    pub fn clear_user(&self) {
        self.commit(UserAction::ClearUser);
    }

    /// Set the transient loading flag.
    pub fn set_loading(&self, loading: bool) {
        self.commit(UserAction::SetLoading(loading));
    }

    /// Merge `patch` into the current user. Does nothing when signed out.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::InvalidState`] if the patch would blank a
    /// required field. The current user is kept unchanged.
    pub fn update_user(&self, patch: UserPatch) -> Result<(), UserError> {
        self.store.dispatch(UserAction::UpdateUser(patch))
    }

    fn commit(&self, action: UserAction) {
        // Only `SetUser` and `UpdateUser` can be rejected.
        if let Err(e) = self.store.dispatch(action) {
            tracing::error!(error = %e, "user action unexpectedly rejected");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
