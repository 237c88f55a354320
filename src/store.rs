//! In-memory key-value store
//!
//! Every node (leader and followers) owns one `KvStore`. Critical sections are
//! short and synchronous: the lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};

/// Thread-safe string key-value store
#[derive(Debug, Default)]
pub struct KvStore {
    data: Mutex<HashMap<String, String>>,
}

impl KvStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.data
            .lock()
            .map_err(|_| Error::Storage("store lock poisoned".into()))
    }

    /// Store a key-value pair, overwriting any existing value
    pub fn put(&self, key: String, value: String) -> Result<()> {
        self.lock()?.insert(key, value);
        Ok(())
    }

    /// Get the current value for a key
    pub fn get(&self, key: &str) -> Result<String> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// Snapshot of all keys at the time of the call
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    /// Copy of the whole map
    pub fn snapshot(&self) -> Result<HashMap<String, String>> {
        Ok(self.lock()?.clone())
    }

    /// Number of keys
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }
}
