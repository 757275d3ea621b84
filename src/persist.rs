//! Persistence middleware mirroring a store's snapshot to key-value storage.
//!
//! Blobs are stored under the store's name as
//! `{"state": <snapshot>, "version": <n>}`. Writes happen synchronously
//! after every commit; reads happen once when the store is built. Neither
//! path ever fails the caller: the in-memory state is always the source of
//! truth for the running session.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::StorageError;
use crate::state::StoreState;
use crate::storage::KeyValueStorage;
use crate::store::Middleware;

/// Version written by this build when none is configured.
pub const DEFAULT_PERSIST_VERSION: u32 = 0;

/// The persisted blob: a store snapshot plus a format version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct PersistEnvelope<T> {
    /// The persisted projection of the store's state.
    pub state: T,
    /// Format version; blobs with a different version are discarded.
    pub version: u32,
}

/// Serialize and write a store's snapshot.
///
/// # Arguments
///
/// * `storage` - Target key-value storage.
/// * `version` - Format version recorded in the envelope.
/// * `state` - The state whose snapshot is written.
///
/// # Errors
///
/// Returns [`StorageError`] if encoding or the storage write fails.
pub fn save_snapshot<S: StoreState>(
    storage: &dyn KeyValueStorage,
    version: u32,
    state: &S,
) -> Result<(), StorageError> {
    let envelope = PersistEnvelope {
        state: state.snapshot(),
        version,
    };
    let json = serde_json::to_string(&envelope)?;
    storage.set_item(S::STORE_NAME, &json)?;
    Ok(())
}

/// Read and decode a store's snapshot.
///
/// # Returns
///
/// - `Ok(Some(snapshot))` if a blob exists, decodes, and carries `version`.
/// - `Ok(None)` if nothing is stored.
///
/// # Errors
///
/// Returns [`StorageError`] if the storage read fails, the blob is not
/// valid JSON for the snapshot type, or its version differs.
pub fn load_snapshot<S: StoreState>(
    storage: &dyn KeyValueStorage,
    version: u32,
) -> Result<Option<S::Snapshot>, StorageError> {
    let Some(json) = storage.get_item(S::STORE_NAME)? else {
        return Ok(None);
    };
    let envelope: PersistEnvelope<S::Snapshot> = serde_json::from_str(&json)?;
    if envelope.version != version {
        return Err(StorageError::VersionMismatch {
            found: envelope.version,
            expected: version,
        });
    }
    Ok(Some(envelope.state))
}

/// Middleware that rehydrates a store at build time and writes its
/// snapshot after every commit.
///
/// `Clone` is cheap; keep a clone to call [`clear`](Persist::clear) later.
pub struct Persist<S: StoreState> {
    storage: Arc<dyn KeyValueStorage>,
    version: u32,
    _state: PhantomData<fn() -> S>,
}

impl<S: StoreState> Clone for Persist<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            version: self.version,
            _state: PhantomData,
        }
    }
}

impl<S: StoreState> std::fmt::Debug for Persist<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persist")
            .field("key", &S::STORE_NAME)
            .field("version", &self.version)
            .finish()
    }
}

impl<S: StoreState> Persist<S> {
    /// Persist to `storage` with [`DEFAULT_PERSIST_VERSION`].
    pub fn new(storage: impl KeyValueStorage + 'static) -> Self {
        Self::from_shared(Arc::new(storage))
    }

    /// Persist to an already shared storage.
    pub fn from_shared(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            version: DEFAULT_PERSIST_VERSION,
            _state: PhantomData,
        }
    }

    /// Use a different format version. Blobs written with any other
    /// version are ignored at rehydration.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// The storage key, i.e. the store's name.
    pub fn key(&self) -> &'static str {
        S::STORE_NAME
    }

    /// Remove the persisted blob. In-memory state is unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the storage removal fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove_item(S::STORE_NAME)?;
        tracing::debug!(store = S::STORE_NAME, "persisted state cleared");
        Ok(())
    }
}

impl<S: StoreState> Middleware<S> for Persist<S> {
    fn on_init(&self, state: S) -> S {
        match load_snapshot::<S>(self.storage.as_ref(), self.version) {
            Ok(Some(snapshot)) => {
                tracing::debug!(store = S::STORE_NAME, "rehydrated from storage");
                state.rehydrate(snapshot)
            }
            Ok(None) => state,
            Err(e) => {
                tracing::warn!(
                    store = S::STORE_NAME,
                    error = %e,
                    "failed to rehydrate; starting from defaults"
                );
                state
            }
        }
    }

    fn on_commit(&self, label: &'static str, state: &S) {
        if let Err(e) = save_snapshot(self.storage.as_ref(), self.version, state) {
            tracing::warn!(
                store = S::STORE_NAME,
                action = label,
                error = %e,
                "failed to persist state; keeping in-memory commit"
            );
        }
    }
}
