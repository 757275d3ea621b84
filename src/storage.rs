//! Key-value storage trait and built-in backends.
//!
//! The persistence middleware only needs a synchronous string-to-string map,
//! the same shape as the browser's `localStorage`. Three backends ship here:
//!
//! - [`MemoryStorage`]: shared in-process map, for tests and headless use.
//! - [`FileStorage`]: one JSON file per key under a base directory.
//! - `LocalStorage`: the browser's `window.localStorage`
//!   (`wasm32` with the `web` feature only).

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// A synchronous key-value storage service.
///
/// Implementations must be cheap to call from the thread that dispatches
/// actions. Errors are reported, but callers in this crate never propagate
/// them past the persistence layer.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the storage is unavailable or unreadable.
    fn get_item(&self, key: &str) -> io::Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the storage is unavailable or the write fails.
    fn set_item(&self, key: &str, value: &str) -> io::Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the storage is unavailable or the removal fails.
    fn remove_item(&self, key: &str) -> io::Result<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Arc<T> {
    fn get_item(&self, key: &str) -> io::Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> io::Result<()> {
        (**self).remove_item(key)
    }
}

/// In-memory storage. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> io::Result<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> io::Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// File-backed storage: each key is stored as `<base_dir>/<key>.json`.
///
/// Writes are atomic via a temp-rename pattern so a crash mid-write never
/// leaves a truncated blob behind. The directory is created lazily on the
/// first write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `base_dir`.
    ///
    /// The directory does not need to exist yet.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the root directory of this storage.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Compute the file path backing `key`.
    ///
    /// # Returns
    ///
    /// `<base_dir>/<key>.json`
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::InvalidInput` for keys that are empty, start
    /// with a dot, or contain path separators.
    pub fn item_path(&self, key: &str) -> io::Result<PathBuf> {
        if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("storage key {key:?} is not a valid file name"),
            ));
        }
        Ok(self.base_dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.item_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.item_path(key)?;
        fs::create_dir_all(&self.base_dir)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> io::Result<()> {
        let path = self.item_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use web::LocalStorage;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod web {
    use std::io;

    use super::KeyValueStorage;

    /// The browser's `window.localStorage`.
    ///
    /// Holds no handle: the storage object is looked up on every call, so
    /// the type stays `Send + Sync` and survives a missing window (e.g. in a
    /// worker) by reporting the storage as unavailable.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct LocalStorage;

    fn storage() -> io::Result<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "localStorage is unavailable"))
    }

    fn js_error(err: wasm_bindgen::JsValue) -> io::Error {
        io::Error::other(format!("{err:?}"))
    }

    impl KeyValueStorage for LocalStorage {
        fn get_item(&self, key: &str) -> io::Result<Option<String>> {
            storage()?.get_item(key).map_err(js_error)
        }

        fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
            storage()?.set_item(key, value).map_err(js_error)
        }

        fn remove_item(&self, key: &str) -> io::Result<()> {
            storage()?.remove_item(key).map_err(js_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.set_item("k", "v1").unwrap();
        storage.set_item("k", "v2").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
        // Removing again is fine.
        storage.remove_item("k").unwrap();
    }

    #[test]
    fn memory_storage_clones_share_items() {
        let a = MemoryStorage::new();
        let b = a.clone();
        a.set_item("shared", "yes").unwrap();
        assert_eq!(b.get_item("shared").unwrap().as_deref(), Some("yes"));
    }

    #[test]
    fn file_storage_item_path() {
        let storage = FileStorage::new("/data/app");
        assert_eq!(
            storage.item_path("dashboard-store").unwrap(),
            PathBuf::from("/data/app/dashboard-store.json")
        );
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let storage = FileStorage::new("/data/app");
        for key in ["", "../escape", "a/b", "a\\b", ".hidden"] {
            let err = storage.item_path(key).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "key {key:?}");
        }
    }

    #[test]
    fn file_storage_roundtrip_creates_dir_lazily() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let storage = FileStorage::new(tmp.path().join("nested"));

        assert_eq!(storage.get_item("user-store").unwrap(), None);

        storage.set_item("user-store", "{\"a\":1}").unwrap();
        assert_eq!(
            storage.get_item("user-store").unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        let tmp_path = storage
            .item_path("user-store")
            .unwrap()
            .with_extension("json.tmp");
        assert!(!tmp_path.exists(), "temp file should be renamed away");
    }

    #[test]
    fn file_storage_remove_missing_is_ok() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let storage = FileStorage::new(tmp.path());
        storage.remove_item("never-written").unwrap();

        storage.set_item("k", "v").unwrap();
        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn arc_storage_delegates() {
        let inner = Arc::new(MemoryStorage::new());
        let dynamic: Arc<dyn KeyValueStorage> = inner.clone();
        dynamic.set_item("k", "v").unwrap();
        assert_eq!(inner.get_item("k").unwrap().as_deref(), Some("v"));
    }
}
